//! The validation engine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;
use formdom::{DomEvent, Node, NodeId, SharedDocument};
use futures::future::join_all;
use tokio::sync::broadcast;

use crate::config::{DiscoveryScope, FormConfig};
use crate::discovery;
use crate::error::{ConfigError, EngineError, LookupError};
use crate::evaluator;
use crate::field::{FieldRecord, FieldSet};
use crate::message::MessageCatalog;
use crate::result::{FieldError, ValidationResult};
use crate::rule::{RuleInput, RuleRegistry};
use crate::session::{FormSession, ValidatedEvent};
use crate::value::FieldValue;

/// Source of "today" for date rules.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

const EVENT_CAPACITY: usize = 256;

/// Validation engine bound to one document.
///
/// The engine owns the rule registry, the message catalog and one session per
/// bound form. It is cheap to clone (uses `Arc` internally) and can be shared
/// across tasks.
///
/// # Example
///
/// ```
/// use formdom::{Document, Element};
/// use valform::{Engine, FormConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let doc = Document::new(Element::form("signup").child(
///     Element::text_input("email").data("val-rules", "required|valid_email"),
/// ))
/// .shared();
///
/// let engine = Engine::new(doc);
/// engine.init(FormConfig::new("signup")).unwrap();
/// assert!(!engine.validate_form("signup").await.unwrap());
/// # }
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    document: SharedDocument,
    rules: RwLock<RuleRegistry>,
    messages: RwLock<MessageCatalog>,
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    events: broadcast::Sender<ValidatedEvent>,
    clock: RwLock<Clock>,
}

/// A session and its pass gate.
///
/// Validation passes hold the gate shared, re-scans hold it exclusively, so a
/// re-scan never lands in the middle of a pass.
struct SessionHandle {
    state: Mutex<FormSession>,
    gate: tokio::sync::RwLock<()>,
}

/// Which fields a partial validation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    One(String),
    Many(Vec<String>),
}

impl FieldSelection {
    pub fn names(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

impl From<&str> for FieldSelection {
    fn from(name: &str) -> Self {
        Self::One(name.to_string())
    }
}

impl From<String> for FieldSelection {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for FieldSelection {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

impl From<&[&str]> for FieldSelection {
    fn from(names: &[&str]) -> Self {
        Self::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldSelection {
    fn from(names: [&str; N]) -> Self {
        Self::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Outcome of an intercepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Every field passed and the form was submitted.
    Submitted,
    /// Submission was cancelled.
    Blocked(ValidationResult),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// What [`Engine::dispatch`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The event does not concern any bound form.
    Ignored,
    /// A watched field was evaluated.
    Validated(bool),
    Submit(SubmitOutcome),
    /// Number of sessions re-scanned.
    Resynced(usize),
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Engine {
    /// Creates an engine for `document` with the built-in rules and messages.
    pub fn new(document: SharedDocument) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let clock: Clock = Arc::new(|| chrono::Local::now().date_naive());
        Self {
            inner: Arc::new(EngineInner {
                document,
                rules: RwLock::new(RuleRegistry::new()),
                messages: RwLock::new(MessageCatalog::new()),
                sessions: RwLock::new(HashMap::new()),
                events,
                clock: RwLock::new(clock),
            }),
        }
    }

    /// Sets the clock date rules compare against.
    pub fn with_clock<F>(self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.set_clock(clock);
        self
    }

    pub fn set_clock<F>(&self, clock: F)
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        *write(&self.inner.clock) = Arc::new(clock);
    }

    pub fn today(&self) -> NaiveDate {
        let clock = read(&self.inner.clock).clone();
        clock()
    }

    pub fn document(&self) -> &SharedDocument {
        &self.inner.document
    }

    /// Receive a [`ValidatedEvent`] for every committed evaluation.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidatedEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Bind a form: discover its fields and start watching them.
    pub fn init(&self, config: FormConfig) -> Result<(), EngineError> {
        config.validate()?;
        let form_id = config.form_id.clone();

        let (form, discovery) = {
            let doc = read(&self.inner.document);
            let form = doc
                .get_element_by_id(&form_id)
                .filter(|id| doc.node(*id).is_some_and(Node::is_form));
            let Some(form) = form else {
                log::error!("[engine] no form element with id '{form_id}'");
                return Err(ConfigError::FormNotFound(form_id).into());
            };
            (form, discovery::discover(&doc, form, &config))
        };

        let mut sessions = write(&self.inner.sessions);
        if sessions.contains_key(&form_id) {
            return Err(ConfigError::AlreadyBound(form_id).into());
        }
        let session = FormSession::new(config, form, discovery);
        log::debug!(
            "[engine] bound form '{}' with fields [{}]",
            form_id,
            session.fields.names().collect::<Vec<_>>().join(", ")
        );
        sessions.insert(
            form_id,
            Arc::new(SessionHandle {
                state: Mutex::new(session),
                gate: tokio::sync::RwLock::new(()),
            }),
        );
        Ok(())
    }

    /// Bind a form from a JSON configuration object.
    pub fn init_json(&self, json: &str) -> Result<(), EngineError> {
        self.init(FormConfig::from_json(json)?)
    }

    /// Unbind a form. Its fields stop being watched.
    pub fn teardown(&self, form_id: &str) -> bool {
        let removed = write(&self.inner.sessions).remove(form_id).is_some();
        if removed {
            log::debug!("[engine] unbound form '{form_id}'");
        }
        removed
    }

    pub fn is_bound(&self, form_id: &str) -> bool {
        read(&self.inner.sessions).contains_key(form_id)
    }

    /// Ids of the bound forms, sorted.
    pub fn form_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = read(&self.inner.sessions).keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of one field.
    pub fn field(&self, form_id: &str, name: &str) -> Option<FieldRecord> {
        let handle = self.session(form_id).ok()?;
        let session = lock(&handle.state);
        session.fields.get(name).cloned()
    }

    /// Snapshot of all fields of a form.
    pub fn fields(&self, form_id: &str) -> Option<FieldSet> {
        let handle = self.session(form_id).ok()?;
        let session = lock(&handle.state);
        Some(session.fields.clone())
    }

    // =========================================================================
    // Extension
    // =========================================================================

    /// Register or replace a rule.
    pub fn add_val_method<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&RuleInput<'_>) -> bool + Send + Sync + 'static,
    {
        write(&self.inner.rules).register(name, f);
    }

    /// Register or replace a rule whose check suspends.
    pub fn add_val_method_async<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&RuleInput<'_>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        write(&self.inner.rules).register_async(name, f);
    }

    /// Register or replace a message template.
    pub fn add_val_message(&self, name: impl Into<String>, template: impl Into<String>) {
        write(&self.inner.messages).set(name, template);
    }

    pub fn has_rule(&self, name: &str) -> bool {
        read(&self.inner.rules).contains(name)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate every field of a form. Returns `true` if all pass.
    pub async fn validate_form(&self, form_id: &str) -> Result<bool, EngineError> {
        let handle = self.session(form_id)?;
        let _gate = handle.gate.read().await;
        let names = Self::all_names(&handle);
        let results = self.evaluate_batch(&handle, &names).await?;
        Ok(results.into_iter().all(|r| r == Some(true)))
    }

    /// Validate every field of a form and collect the failures.
    pub async fn validate_form_report(&self, form_id: &str) -> Result<ValidationResult, EngineError> {
        let handle = self.session(form_id)?;
        let _gate = handle.gate.read().await;
        let names = Self::all_names(&handle);
        self.evaluate_batch(&handle, &names).await?;

        let session = lock(&handle.state);
        Ok(names
            .iter()
            .filter_map(|name| session.fields.get(name))
            .filter_map(FieldError::from_record)
            .collect())
    }

    /// Validate some fields. Returns `true` if all of them pass; unknown
    /// names count as failures.
    pub async fn partial_validation(
        &self,
        form_id: &str,
        selection: impl Into<FieldSelection>,
    ) -> Result<bool, EngineError> {
        let selection = selection.into();
        let handle = self.session(form_id)?;
        let _gate = handle.gate.read().await;
        let results = self.evaluate_batch(&handle, selection.names()).await?;
        Ok(results.into_iter().all(|r| r == Some(true)))
    }

    /// Validate some fields and return their records in selection order,
    /// `None` for unknown names.
    pub async fn partial_validation_data(
        &self,
        form_id: &str,
        selection: impl Into<FieldSelection>,
    ) -> Result<Vec<Option<FieldRecord>>, EngineError> {
        let selection = selection.into();
        let handle = self.session(form_id)?;
        let _gate = handle.gate.read().await;
        let results = self.evaluate_batch(&handle, selection.names()).await?;

        let session = lock(&handle.state);
        Ok(selection
            .names()
            .iter()
            .zip(results)
            .map(|(name, result)| result.and_then(|_| session.fields.get(name).cloned()))
            .collect())
    }

    /// Set a field's value programmatically and validate it.
    ///
    /// The value is used as given instead of being read from the document.
    pub async fn validate_hidden(
        &self,
        form_id: &str,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<bool, EngineError> {
        let handle = self.session(form_id)?;
        let _gate = handle.gate.read().await;
        self.evaluate_with_dependent(&handle, name, Some(value.into()))
            .await
    }

    /// Validate the field `node` belongs to after its value changed.
    ///
    /// Returns `None` if no bound form watches `node`.
    pub async fn handle_change(&self, node: NodeId) -> Result<Option<bool>, EngineError> {
        let Some((handle, name)) = self.session_watching(node) else {
            log::debug!("[engine] change on unwatched node {node:?}");
            return Ok(None);
        };
        let _gate = handle.gate.read().await;
        self.evaluate_with_dependent(&handle, &name, None)
            .await
            .map(Some)
    }

    /// Validate a form on submission and submit it if every field passes.
    pub async fn handle_submit(&self, form_id: &str) -> Result<SubmitOutcome, EngineError> {
        let result = self.validate_form_report(form_id).await?;
        if result.is_invalid() {
            log::warn!(
                "[engine] form '{}' is invalid, submission cancelled ({})",
                form_id,
                result.invalid_fields().join(", ")
            );
            return Ok(SubmitOutcome::Blocked(result));
        }

        let handle = self.session(form_id)?;
        let form = lock(&handle.state).form;
        write(&self.inner.document).submit(form);
        Ok(SubmitOutcome::Submitted)
    }

    /// Re-scan a form after its structure changed and merge the result into
    /// the field registry.
    pub async fn resync(&self, form_id: &str) -> Result<(), EngineError> {
        let handle = self.session(form_id)?;
        let _gate = handle.gate.write().await;
        let mut session = lock(&handle.state);
        let doc = read(&self.inner.document);
        let discovery = discovery::discover(&doc, session.form, &session.config);
        session.reconcile(discovery);
        Ok(())
    }

    /// Route a document event to the bound forms.
    pub async fn dispatch(&self, event: DomEvent) -> Result<Dispatched, EngineError> {
        match event {
            DomEvent::Change { target } => Ok(match self.handle_change(target).await? {
                Some(passed) => Dispatched::Validated(passed),
                None => Dispatched::Ignored,
            }),
            DomEvent::Submit { form } => {
                let bound = self.bound_to(|s| s.form == form);
                match bound.into_iter().next() {
                    Some(form_id) => Ok(Dispatched::Submit(self.handle_submit(&form_id).await?)),
                    None => Ok(Dispatched::Ignored),
                }
            }
            DomEvent::Mutated { form } => {
                let bound =
                    self.bound_to(|s| s.form == form || s.config.scope == DiscoveryScope::Document);
                for form_id in &bound {
                    self.resync(form_id).await?;
                }
                Ok(if bound.is_empty() {
                    Dispatched::Ignored
                } else {
                    Dispatched::Resynced(bound.len())
                })
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn session(&self, form_id: &str) -> Result<Arc<SessionHandle>, LookupError> {
        read(&self.inner.sessions)
            .get(form_id)
            .cloned()
            .ok_or_else(|| LookupError::UnknownForm(form_id.to_string()))
    }

    fn session_watching(&self, node: NodeId) -> Option<(Arc<SessionHandle>, String)> {
        let sessions = read(&self.inner.sessions);
        sessions.values().find_map(|handle| {
            let name = lock(&handle.state).field_for(node)?.to_string();
            Some((handle.clone(), name))
        })
    }

    /// Ids of the sessions matching `predicate`, sorted.
    fn bound_to(&self, predicate: impl Fn(&FormSession) -> bool) -> Vec<String> {
        let sessions = read(&self.inner.sessions);
        let mut ids: Vec<_> = sessions
            .iter()
            .filter(|(_, handle)| predicate(&*lock(&handle.state)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn all_names(handle: &SessionHandle) -> Vec<String> {
        lock(&handle.state)
            .fields
            .names()
            .map(str::to_string)
            .collect()
    }

    fn commit(
        &self,
        handle: &SessionHandle,
        evaluated: &evaluator::Evaluated,
    ) -> Result<Option<FieldRecord>, EngineError> {
        let mut session = lock(&handle.state);
        let mut doc = write(&self.inner.document);
        let messages = read(&self.inner.messages);
        evaluator::commit(&mut session, &mut doc, &messages, &self.inner.events, evaluated)
            .inspect_err(log_failure)
    }

    async fn evaluate(
        &self,
        handle: &SessionHandle,
        name: &str,
        supplied: Option<FieldValue>,
    ) -> Result<bool, EngineError> {
        let (prepared, fields) = {
            let today = self.today();
            let mut session = lock(&handle.state);
            let mut doc = write(&self.inner.document);
            let plan = {
                let rules = read(&self.inner.rules);
                evaluator::plan(&session, &doc, &rules, name, supplied).inspect_err(log_failure)?
            };
            let prepared = evaluator::prepare(&mut session, &mut doc, plan, today);
            (prepared, session.fields.clone())
        };
        let evaluated = evaluator::run(prepared, &fields).await;
        self.commit(handle, &evaluated)?;
        Ok(evaluated.passed())
    }

    /// Evaluate `name`, then re-evaluate the field it names in `with` if that
    /// field was visited before.
    async fn evaluate_with_dependent(
        &self,
        handle: &SessionHandle,
        name: &str,
        supplied: Option<FieldValue>,
    ) -> Result<bool, EngineError> {
        let passed = self.evaluate(handle, name, supplied).await?;
        if !passed {
            return Ok(false);
        }

        let dependent = {
            let session = lock(&handle.state);
            let with = session.fields.get(name).and_then(|r| r.with.clone());
            match with {
                Some(with) => match session.fields.get(&with) {
                    Some(record) if record.visited => Some(with),
                    Some(_) => None,
                    None => {
                        log::debug!("[engine] '{name}' re-validates unknown field '{with}'");
                        None
                    }
                },
                None => None,
            }
        };
        if let Some(dependent) = dependent {
            log::debug!("[engine] '{name}' passed, re-validating '{dependent}'");
            self.evaluate(handle, &dependent, None).await?;
        }
        Ok(true)
    }

    /// Evaluate several fields of one session concurrently.
    ///
    /// Every field is planned before anything changes and prepared before any
    /// rule runs; all rules then see the same snapshot of the session, so no
    /// field depends on the order of the batch. The result holds one entry per
    /// name in input order, `None` for unknown names.
    async fn evaluate_batch(
        &self,
        handle: &SessionHandle,
        names: &[String],
    ) -> Result<Vec<Option<bool>>, EngineError> {
        let (prepared, fields) = {
            let today = self.today();
            let mut session = lock(&handle.state);
            let mut doc = write(&self.inner.document);

            let mut plans = Vec::with_capacity(names.len());
            {
                let rules = read(&self.inner.rules);
                for name in names {
                    match evaluator::plan(&session, &doc, &rules, name, None) {
                        Ok(plan) => plans.push(Some(plan)),
                        Err(EngineError::Lookup(err)) => {
                            log::warn!("[engine] {err}, skipped");
                            plans.push(None);
                        }
                        Err(err) => {
                            log_failure(&err);
                            return Err(err);
                        }
                    }
                }
            }

            let mut prepared = Vec::with_capacity(plans.len());
            for plan in plans {
                prepared.push(plan.map(|plan| evaluator::prepare(&mut session, &mut doc, plan, today)));
            }
            (prepared, session.fields.clone())
        };

        let fields = &fields;
        let evaluated = join_all(prepared.into_iter().map(|p| async move {
            match p {
                Some(p) => Some(evaluator::run(p, fields).await),
                None => None,
            }
        }))
        .await;

        let mut results = Vec::with_capacity(evaluated.len());
        for evaluated in evaluated {
            match evaluated {
                Some(evaluated) => {
                    self.commit(handle, &evaluated)?;
                    results.push(Some(evaluated.passed()));
                }
                None => results.push(None),
            }
        }
        Ok(results)
    }
}

fn log_failure(err: &EngineError) {
    if err.is_lookup() {
        log::warn!("[engine] {err}");
    } else {
        log::error!("[engine] {err}");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("forms", &self.form_ids())
            .finish_non_exhaustive()
    }
}
