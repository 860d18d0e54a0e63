//! Rule and message lookup errors

/// A rule string references something that is not registered.
///
/// These indicate misconfiguration and are never produced for ordinary
/// invalid input.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleError {
    /// No predicate registered under this name.
    #[error("unknown validation rule '{rule}' on field '{field}'")]
    UnknownRule { rule: String, field: String },

    /// No message template registered under this name.
    #[error("no validation message registered for rule '{rule}'")]
    UnknownMessage { rule: String },
}

impl RuleError {
    /// Creates a new unknown rule error.
    pub fn unknown_rule(rule: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownRule {
            rule: rule.into(),
            field: field.into(),
        }
    }

    /// Creates a new unknown message error.
    pub fn unknown_message(rule: impl Into<String>) -> Self {
        Self::UnknownMessage { rule: rule.into() }
    }
}
