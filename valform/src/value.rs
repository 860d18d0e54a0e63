//! Value enum for field values

use std::borrow::Cow;

use serde::Deserialize;
use serde::Serialize;

/// The current value of a field.
///
/// Values read from the document are always [`Text`](FieldValue::Text) (or
/// [`List`](FieldValue::List) for checkbox groups). The other variants only
/// enter through programmatic updates such as
/// [`Engine::validate_hidden`](crate::Engine::validate_hidden).
///
/// Equality is strict: values of different variants are never equal, so
/// `FieldValue::Number(7.0) != FieldValue::from("7")`.
///
/// # Example
///
/// ```
/// use valform::FieldValue;
///
/// let name = FieldValue::from("Ada");
/// let age = FieldValue::from(36);
/// let tags = FieldValue::from(vec!["a".to_string(), "b".to_string()]);
///
/// assert_eq!(age.as_text(), "36");
/// assert_eq!(tags.as_text(), "a,b");
/// assert!(FieldValue::Null.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Never set.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Ordered values of the checked members of a checkbox group.
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for `Null`, empty text and an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Number(_) => false,
        }
    }

    /// Textual form used by pattern and length rules.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Owned(b.to_string()),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
            Self::List(items) => Cow::Owned(items.join(",")),
        }
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

// =============================================================================
// From implementations
// =============================================================================

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}
