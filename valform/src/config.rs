//! Form session configuration

use serde::Deserialize;
use serde::Serialize;

use crate::date::DateFormat;
use crate::error::ConfigError;

/// Where field discovery looks for validatable elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryScope {
    /// Only descendants of the bound form.
    #[default]
    Form,
    /// The whole document.
    Document,
}

/// How a re-scan is merged into an existing field registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcilePolicy {
    /// Keep names present in both scans, add names only in the new scan,
    /// drop names only in the old scan.
    #[default]
    SetDifference,
    /// Keep names present in both scans, drop names only in the old scan, and
    /// add names only in the new scan if the new scan found more fields than
    /// the registry held.
    GrowOnly,
}

/// Configuration for one bound form.
///
/// # Example
///
/// ```
/// use valform::{DateFormat, FormConfig};
///
/// let config = FormConfig::new("signup")
///     .with_append_after("form-row")
///     .with_date_format(DateFormat::YearMonthDay);
/// assert_eq!(config.validation_error_class, "val--error");
///
/// let parsed = FormConfig::from_json(r#"{ "formId": "signup", "dateFormat": "YYYY-mm-dd" }"#).unwrap();
/// assert_eq!(parsed.date_format, DateFormat::YearMonthDay);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    /// Id of the `<form>` element to bind.
    pub form_id: String,

    /// Class set on invalid fields and on injected error elements.
    ///
    /// Default: `val--error`
    pub validation_error_class: String,

    /// Class set on valid fields.
    ///
    /// Default: `val--valid`
    pub validation_valid_class: String,

    /// Tag of injected error elements.
    ///
    /// Default: `small`
    pub error_element: String,

    /// Class of the element after which error messages are inserted. When
    /// unset, messages go right after the field (or after a checkbox/radio
    /// group's parent).
    pub append_after: Option<String>,

    /// Format of date inputs.
    ///
    /// Default: `dd/mm/YYYY`
    pub date_format: DateFormat,

    /// Discovery scope.
    ///
    /// Default: the bound form
    pub scope: DiscoveryScope,

    /// Merge policy for re-scans.
    ///
    /// Default: set difference
    pub reconcile: ReconcilePolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            form_id: String::new(),
            validation_error_class: "val--error".to_string(),
            validation_valid_class: "val--valid".to_string(),
            error_element: "small".to_string(),
            append_after: None,
            date_format: DateFormat::default(),
            scope: DiscoveryScope::default(),
            reconcile: ReconcilePolicy::default(),
        }
    }
}

impl FormConfig {
    /// Creates a config for `form_id` with default values.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            ..Default::default()
        }
    }

    /// Parses a JSON configuration object. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields that must be present for binding.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.form_id.trim().is_empty() {
            return Err(ConfigError::MissingFormId);
        }
        Ok(())
    }

    /// Sets the error class.
    pub fn with_error_class(mut self, class: impl Into<String>) -> Self {
        self.validation_error_class = class.into();
        self
    }

    /// Sets the valid class.
    pub fn with_valid_class(mut self, class: impl Into<String>) -> Self {
        self.validation_valid_class = class.into();
        self
    }

    /// Sets the error element tag.
    pub fn with_error_element(mut self, tag: impl Into<String>) -> Self {
        self.error_element = tag.into();
        self
    }

    /// Sets the append-after class.
    pub fn with_append_after(mut self, class: impl Into<String>) -> Self {
        self.append_after = Some(class.into());
        self
    }

    /// Sets the date format.
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    /// Sets the discovery scope.
    pub fn with_scope(mut self, scope: DiscoveryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the reconcile policy.
    pub fn with_reconcile(mut self, policy: ReconcilePolicy) -> Self {
        self.reconcile = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FormConfig::new("f");
        assert_eq!(config.validation_valid_class, "val--valid");
        assert_eq!(config.error_element, "small");
        assert_eq!(config.append_after, None);
        assert_eq!(config.date_format, DateFormat::DayMonthYear);
        assert_eq!(config.reconcile, ReconcilePolicy::SetDifference);
    }

    #[test]
    fn test_from_json_requires_form_id() {
        assert!(matches!(
            FormConfig::from_json(r#"{ "errorElement": "span" }"#),
            Err(ConfigError::MissingFormId)
        ));
    }

    #[test]
    fn test_from_json_rejects_unknown_date_format() {
        let err = FormConfig::from_json(r#"{ "formId": "f", "dateFormat": "dd.mm.YYYY" }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("dd.mm.YYYY"));
    }

    #[test]
    fn test_from_json_all_keys() {
        let config = FormConfig::from_json(
            r#"{
                "formId": "f",
                "validationErrorClass": "bad",
                "validationValidClass": "good",
                "errorElement": "span",
                "appendAfter": "row",
                "dateFormat": "isoDateTime",
                "scope": "document",
                "reconcile": "growOnly"
            }"#,
        )
        .unwrap();
        assert_eq!(config.validation_error_class, "bad");
        assert_eq!(config.append_after.as_deref(), Some("row"));
        assert_eq!(config.date_format, DateFormat::IsoDateTime);
        assert_eq!(config.scope, DiscoveryScope::Document);
        assert_eq!(config.reconcile, ReconcilePolicy::GrowOnly);
    }
}
