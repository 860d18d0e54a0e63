//! Lookup misses

/// A form, field or element could not be found.
///
/// Batch operations log these and skip the affected name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No session is bound for the form id.
    #[error("no form session bound for '{0}'")]
    UnknownForm(String),

    /// The session has no field with this name.
    #[error("form '{form}' has no field named '{field}'")]
    UnknownField { form: String, field: String },

    /// The element is not inside any `<form>`.
    #[error("element is not inside a form")]
    NoFormAncestor,
}

impl LookupError {
    /// Creates a new unknown field error.
    pub fn unknown_field(form: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            form: form.into(),
            field: field.into(),
        }
    }
}
