//! Rule evaluation of a single field.
//!
//! An evaluation runs in four steps so that no lock is held while a rule
//! suspends and nothing is touched before every rule name is known:
//!
//! 1. [`plan`] resolves the field's value and its rule predicates without
//!    changing any state. An unknown rule fails here.
//! 2. [`prepare`] applies the plan: marks the field visited, stores its value,
//!    clears the previous reflection and takes a generation ticket.
//! 3. [`run`] applies the rules in order against a snapshot of the session
//!    taken once every field of the pass is prepared, stopping at the first
//!    failure.
//! 4. [`commit`] records the outcome, reflects it into the document and
//!    notifies subscribers, unless a newer evaluation of the field started in
//!    the meantime.

use chrono::NaiveDate;
use formdom::Document;
use tokio::sync::broadcast;

use crate::date::DateFormat;
use crate::discovery;
use crate::error::{EngineError, LookupError};
use crate::field::{FieldKind, FieldRecord, FieldSet};
use crate::message::MessageCatalog;
use crate::reflect;
use crate::rule::{Predicate, RuleInput, RuleRegistry, RuleSpec};
use crate::session::{FormSession, ValidatedEvent};
use crate::value::FieldValue;

/// A field's resolved value and rules, not yet applied to the session.
pub struct Plan {
    name: String,
    value: FieldValue,
    checked: Option<bool>,
    /// The value was supplied by the caller rather than read.
    supplied: bool,
    skip: bool,
    rules: Vec<(RuleSpec, Predicate)>,
}

/// A field ready to have its rules applied.
pub struct Prepared {
    ticket: u64,
    name: String,
    rules: Vec<(RuleSpec, Predicate)>,
    date_format: DateFormat,
    today: NaiveDate,
}

/// Outcome of [`run`].
pub struct Evaluated {
    name: String,
    ticket: u64,
    /// The first failing rule, `None` if all passed.
    failed: Option<RuleSpec>,
}

impl Evaluated {
    pub fn passed(&self) -> bool {
        self.failed.is_none()
    }
}

/// Resolve what evaluating `name` involves.
///
/// `supplied` replaces the value instead of reading it from the document
/// (hidden field updates). For checkbox and radio fields a non-empty supplied
/// value counts as checked.
pub fn plan(
    session: &FormSession,
    doc: &Document,
    rules: &RuleRegistry,
    name: &str,
    supplied: Option<FieldValue>,
) -> Result<Plan, EngineError> {
    let Some(record) = session.fields.get(name) else {
        return Err(LookupError::unknown_field(&session.form_id, name).into());
    };

    let from_caller = supplied.is_some();
    let (value, checked) = match supplied {
        Some(value) => {
            let checked = record.kind.is_group().then(|| !value.is_empty());
            (value, checked)
        }
        None => discovery::read_value(doc, record.kind, session.members(name)),
    };

    let skip = record.allow_empty && value.is_empty();
    let resolved = if skip {
        Vec::new()
    } else {
        record
            .rules
            .iter()
            .map(|spec| rules.lookup(&spec.name, name).map(|p| (spec.clone(), p)))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(Plan {
        name: name.to_string(),
        value,
        checked,
        supplied: from_caller,
        skip,
        rules: resolved,
    })
}

/// Apply `plan` to the session and the document.
pub fn prepare(session: &mut FormSession, doc: &mut Document, plan: Plan, today: NaiveDate) -> Prepared {
    let Plan {
        name,
        value,
        checked,
        supplied,
        skip,
        rules,
    } = plan;

    let primary = session.members(&name).first().copied();
    if let Some(record) = session.fields.get_mut(&name) {
        record.visited = true;
        if let (true, FieldKind::Scalar, Some(primary)) = (supplied, record.kind, primary) {
            doc.set_value(primary, value.as_text());
        }
        if record.kind.is_group() {
            record.checked = checked;
        }
        record.value = value;
    }

    if let Some(target) = session.target(doc, &name) {
        reflect::clear(doc, &session.config, target);
    }
    let ticket = session.next_ticket(&name);

    log::debug!(
        "[eval] {}.{}: {} rule(s){}",
        session.form_id,
        name,
        rules.len(),
        if skip { ", empty value allowed" } else { "" }
    );

    Prepared {
        ticket,
        name,
        rules,
        date_format: session.config.date_format,
        today,
    }
}

/// Apply the rules in order against `fields`. Suspending rules are awaited
/// one at a time.
pub async fn run(prepared: Prepared, fields: &FieldSet) -> Evaluated {
    let Prepared {
        ticket,
        name,
        rules,
        date_format,
        today,
    } = prepared;

    let mut failed = None;
    if let Some(record) = fields.get(&name) {
        for (spec, predicate) in rules {
            let verdict = {
                let input = RuleInput {
                    field: record,
                    fields,
                    param: spec.param.as_deref(),
                    date_format,
                    today,
                };
                predicate(&input)
            };
            if !verdict.resolve().await {
                log::debug!("[eval] {}: rule '{}' failed", name, spec);
                failed = Some(spec);
                break;
            }
        }
    }

    Evaluated {
        name,
        ticket,
        failed,
    }
}

/// Record the outcome of `evaluated` in the session and the document.
///
/// Returns the committed record, or `None` if the evaluation went stale.
pub fn commit(
    session: &mut FormSession,
    doc: &mut Document,
    messages: &MessageCatalog,
    events: &broadcast::Sender<ValidatedEvent>,
    evaluated: &Evaluated,
) -> Result<Option<FieldRecord>, EngineError> {
    let name = evaluated.name.as_str();
    if !session.is_current(name, evaluated.ticket) {
        log::debug!("[eval] {}.{}: discarding stale result", session.form_id, name);
        return Ok(None);
    }

    let message = match &evaluated.failed {
        Some(spec) => {
            let display = session
                .fields
                .get(name)
                .map(|r| r.display.as_str())
                .unwrap_or(name);
            Some(messages.render(spec, display, &session.field_names)?)
        }
        None => None,
    };

    let Some(record) = session.fields.get_mut(name) else {
        return Ok(None);
    };
    match &message {
        Some(message) => record.mark_invalid(message.clone()),
        None => record.mark_valid(),
    }
    let snapshot = record.clone();

    if let Some(target) = session.target(doc, name) {
        match &message {
            Some(message) => reflect::show_invalid(doc, &session.config, target, message),
            None => reflect::show_valid(doc, &session.config, target),
        }
    }

    // No subscribers is not an error
    let _ = events.send(ValidatedEvent {
        form_id: session.form_id.clone(),
        field: snapshot.clone(),
    });
    Ok(Some(snapshot))
}
