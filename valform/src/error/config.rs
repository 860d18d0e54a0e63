//! Configuration error types

/// Errors that abort binding a form.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No `formId` was given.
    #[error("configuration requires a non-empty \"formId\"")]
    MissingFormId,

    /// The date format is not one of the supported formats.
    #[error("date format '{0}' is not supported (expected one of dd/mm/YYYY, YYYY-mm-dd, mm/dd/YYYY, isoDateTime)")]
    UnsupportedDateFormat(String),

    /// No `<form>` element with the configured id exists in the document.
    #[error("no form element with id '{0}' found in the document")]
    FormNotFound(String),

    /// A session for this form is already bound.
    #[error("form '{0}' is already initialized")]
    AlreadyBound(String),

    /// The configuration object could not be parsed.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
