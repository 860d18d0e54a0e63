//! Field records and the per-session field registry.

use std::collections::HashMap;

use serde::Serialize;

use crate::rule::RuleSpec;
use crate::value::FieldValue;

/// How a field's value is represented in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Text-like input, select or textarea.
    #[default]
    Scalar,
    Checkbox,
    Radio,
}

impl FieldKind {
    /// Map an `<input type>` to a kind.
    pub fn from_input_type(input_type: &str) -> Self {
        match input_type {
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            _ => Self::Scalar,
        }
    }

    /// Checkbox and radio fields group every element sharing a name.
    pub fn is_group(self) -> bool {
        matches!(self, Self::Checkbox | Self::Radio)
    }
}

/// Outcome of the last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Validity {
    /// Never evaluated.
    #[default]
    Unknown,
    Valid,
    Invalid,
}

/// State of one named field within a form session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub name: String,
    /// Label used in error messages.
    pub display: String,
    /// Rules in evaluation order.
    pub rules: Vec<RuleSpec>,
    pub allow_empty: bool,
    pub value: FieldValue,
    pub kind: FieldKind,
    pub valid: Validity,
    pub visited: bool,
    pub error: Option<String>,
    /// Field re-validated after this one validates successfully.
    pub with: Option<String>,
    /// Whether any member of a checkbox/radio group is checked.
    pub checked: Option<bool>,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            display: name.clone(),
            name,
            rules: Vec::new(),
            allow_empty: false,
            value: FieldValue::Null,
            kind,
            valid: Validity::Unknown,
            visited: false,
            error: None,
            with: None,
            checked: kind.is_group().then_some(false),
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Sets the rules from a `|`-delimited rule string.
    pub fn with_rules(mut self, rules: &str) -> Self {
        self.rules = RuleSpec::parse_list(rules);
        self
    }

    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn with_dependent(mut self, name: impl Into<String>) -> Self {
        self.with = Some(name.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid == Validity::Valid
    }

    pub fn mark_valid(&mut self) {
        self.valid = Validity::Valid;
        self.error = None;
    }

    pub fn mark_invalid(&mut self, message: String) {
        self.valid = Validity::Invalid;
        self.error = Some(message);
    }
}

/// Insertion-ordered set of field records with unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldSet {
    records: Vec<FieldRecord>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `record`, replacing any record with the same name in place.
    ///
    /// Returns the replaced record.
    pub fn insert(&mut self, record: FieldRecord) -> Option<FieldRecord> {
        match self.position(&record.name) {
            Some(idx) => Some(std::mem::replace(&mut self.records[idx], record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldRecord> {
        self.position(name).map(|idx| self.records.remove(idx))
    }

    pub fn get(&self, name: &str) -> Option<&FieldRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldRecord> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
        self.records.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    /// Name to display label, for message rendering.
    pub fn display_names(&self) -> HashMap<String, String> {
        self.records
            .iter()
            .map(|r| (r.name.clone(), r.display.clone()))
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }
}

impl FromIterator<FieldRecord> for FieldSet {
    /// Later records with an already seen name are dropped.
    fn from_iter<I: IntoIterator<Item = FieldRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            if !set.contains(&record.name) {
                set.records.push(record);
            }
        }
        set
    }
}

impl IntoIterator for FieldSet {
    type Item = FieldRecord;
    type IntoIter = std::vec::IntoIter<FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldRecord;
    type IntoIter = std::slice::Iter<'a, FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let scalar = FieldRecord::new("email", FieldKind::Scalar);
        assert_eq!(scalar.display, "email");
        assert_eq!(scalar.valid, Validity::Unknown);
        assert_eq!(scalar.checked, None);

        let group = FieldRecord::new("terms", FieldKind::Checkbox);
        assert_eq!(group.checked, Some(false));
    }

    #[test]
    fn test_mark_keeps_error_consistent() {
        let mut record = FieldRecord::new("email", FieldKind::Scalar);
        record.mark_invalid("bad".to_string());
        assert_eq!(record.valid, Validity::Invalid);
        assert_eq!(record.error.as_deref(), Some("bad"));

        record.mark_valid();
        assert!(record.is_valid());
        assert_eq!(record.error, None);
    }

    #[test]
    fn test_field_set_unique_names_in_order() {
        let set: FieldSet = ["a", "b", "a", "c"]
            .into_iter()
            .map(|n| FieldRecord::new(n, FieldKind::Scalar))
            .collect();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let mut set = set;
        let replaced = set.insert(FieldRecord::new("b", FieldKind::Radio));
        assert!(replaced.is_some());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(set.get("b").map(|r| r.kind), Some(FieldKind::Radio));
    }

    #[test]
    fn test_display_names() {
        let mut set = FieldSet::new();
        set.insert(FieldRecord::new("dob", FieldKind::Scalar).with_display("Date of birth"));
        assert_eq!(set.display_names().get("dob").map(String::as_str), Some("Date of birth"));
    }

    #[test]
    fn test_serialize_snapshot() {
        let record = FieldRecord::new("age", FieldKind::Scalar)
            .with_rules("required|numeric")
            .with_dependent("other");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["allowEmpty"], false);
        assert_eq!(json["valid"], "unknown");
        assert_eq!(json["value"], serde_json::Value::Null);
        assert_eq!(json["rules"][1]["name"], "numeric");
        assert_eq!(json["with"], "other");
    }
}
