//! Validation rules.
//!
//! A field carries an ordered list of [`RuleSpec`]s parsed from its rule
//! string (`required|min_length[8]|matches[password]`). Each spec names a
//! predicate in the [`RuleRegistry`] and may carry one string parameter.

mod builtin;
mod registry;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::date::DateFormat;
use crate::field::{FieldRecord, FieldSet};

pub use registry::{Predicate, RuleRegistry};

/// Type alias for boxed futures used in async validation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

static RULE_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\[(.+)\]$").expect("valid regex"));

/// One entry of a field's rule list: a rule name and an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RuleSpec {
    pub name: String,
    pub param: Option<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, param: Option<String>) -> Self {
        Self {
            name: name.into(),
            param,
        }
    }

    /// Parse `name` or `name[param]`.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match RULE_SPEC.captures(spec) {
            Some(caps) => Self::new(&caps[1], Some(caps[2].to_string())),
            None => Self::new(spec, None),
        }
    }

    /// Parse a `|`-delimited rule string, skipping empty segments.
    pub fn parse_list(rules: &str) -> Vec<Self> {
        rules
            .split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Whether the parameter carries the inclusive-equality marker (`=`).
    pub fn is_inclusive(&self) -> bool {
        self.param.as_deref().is_some_and(|p| p.starts_with('='))
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{}[{}]", self.name, param),
            None => f.write_str(&self.name),
        }
    }
}

/// Split an `=`-prefixed parameter into `(inclusive, rest)`.
pub fn split_inclusive(param: &str) -> (bool, &str) {
    match param.strip_prefix('=') {
        Some(rest) => (true, rest),
        None => (false, param),
    }
}

/// Split a `field:years` parameter.
pub fn split_pair(param: &str) -> Option<(&str, &str)> {
    param.split_once(':')
}

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// The field under evaluation, with its freshly resolved value.
    pub field: &'a FieldRecord,
    /// All fields of the owning session, for cross-field rules.
    pub fields: &'a FieldSet,
    /// The rule parameter, if any.
    pub param: Option<&'a str>,
    /// Date format of the owning session.
    pub date_format: DateFormat,
    /// The date treated as "today" by date rules.
    pub today: NaiveDate,
}

impl<'a> RuleInput<'a> {
    /// Textual value of the field under evaluation.
    pub fn text(&self) -> std::borrow::Cow<'a, str> {
        self.field.value.as_text()
    }

    /// Look up another field of the session.
    pub fn other(&self, name: &str) -> Option<&'a FieldRecord> {
        self.fields.get(name)
    }

    pub fn parse_date(&self, input: &str) -> Option<NaiveDate> {
        self.date_format.parse(input)
    }
}

/// Outcome of invoking a predicate.
pub enum Verdict {
    /// The check completed.
    Ready(bool),
    /// The check suspends, e.g. a remote uniqueness lookup.
    Pending(BoxFuture<'static, bool>),
}

impl Verdict {
    pub async fn resolve(self) -> bool {
        match self {
            Self::Ready(passed) => passed,
            Self::Pending(fut) => fut.await,
        }
    }
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        Self::Ready(passed)
    }
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(passed) => write!(f, "Ready({passed})"),
            Self::Pending(_) => write!(f, "Pending(...)"),
        }
    }
}
