//! Message catalog and rendering.
//!
//! Templates use `%s` placeholders filled in order. The first is always the
//! failing field's display name; the rest come from the rule parameter.

use std::collections::HashMap;

use crate::error::RuleError;
use crate::rule::{RuleSpec, split_inclusive, split_pair};

/// Suffix appended to comparison messages whose parameter is inclusive.
pub const EQUALS_ADDITION: &str = "equals_addition";
/// Suffix appended to `date_in_past`/`date_in_future` messages when today counts.
pub const DATE_ADDITION: &str = "date_addition";

const PLACEHOLDER: &str = "%s";

const DEFAULTS: &[(&str, &str)] = &[
    ("required", "The %s field is required."),
    ("matches", "The %s field does not match the %s field."),
    ("min_length", "The %s field must be at least %s characters in length."),
    ("max_length", "The %s field must not exceed %s characters in length."),
    ("exact_length", "The %s field must be exactly %s characters in length."),
    ("greater_than", "The %s field must contain a number greater than %s."),
    ("less_than", "The %s field must contain a number less than %s."),
    ("alpha", "The %s field must only contain alphabetical characters."),
    ("alpha_numeric", "The %s field must only contain alpha-numeric characters."),
    (
        "alpha_dash",
        "The %s field must only contain alpha-numeric characters, underscores, and dashes.",
    ),
    ("numeric", "The %s field must contain only numbers."),
    ("integer", "The %s field must contain an integer."),
    ("decimal", "The %s field must contain a decimal number."),
    ("is_natural", "The %s field must contain only positive numbers."),
    ("is_natural_no_zero", "The %s field must contain a number greater than zero."),
    ("valid_ip", "The %s field must contain a valid IP."),
    ("valid_base64", "The %s field must contain a base64 string."),
    ("valid_credit_card", "The %s field must contain a valid credit card number."),
    ("is_year", "The %s field must be a valid year."),
    ("year_in_past", "The %s field must be current year or in the past."),
    ("years_between", "The %s date must be %s years after %s date."),
    ("min_years_in_past", "The %s date must be at least %s years in the past."),
    ("max_years_in_past", "The %s date must be no more than %s years in the past."),
    ("valid_date", "The %s field must be a valid date."),
    ("date_in_past", "The %s field must be in the past."),
    ("date_in_future", "The %s field must be in the future."),
    ("date_greater_than", "The %s date must be greater than %s date."),
    ("date_less_than", "The %s date must be less than %s date."),
    ("valid_email", "The %s field must contain a valid email address."),
    ("uk_postcode", "The %s field must be a valid UK postcode."),
    ("uk_phonenumber", "The %s field must be UK phone number"),
    ("valid_url", "The %s field must contain a valid URL."),
    (EQUALS_ADDITION, "It can be equal to it."),
    (DATE_ADDITION, "It can be today."),
];

/// Mapping from rule name to message template.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Creates a catalog seeded with the messages of the built-in rules.
    pub fn new() -> Self {
        Self {
            templates: DEFAULTS
                .iter()
                .map(|(name, template)| (name.to_string(), template.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&str, RuleError> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RuleError::unknown_message(name))
    }

    /// Store or replace the template for `name`.
    pub fn set(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(name.into(), template.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render the message for a failed `spec` on a field shown as `display`.
    ///
    /// A parameter naming another field of the session is shown by that
    /// field's display name.
    pub fn render(
        &self,
        spec: &RuleSpec,
        display: &str,
        field_names: &HashMap<String, String>,
    ) -> Result<String, RuleError> {
        let template = self.get(&spec.name)?;
        let resolve = |name: &str| -> String {
            field_names
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string())
        };

        let mut args = vec![display.to_string()];
        if let Some(param) = spec.param.as_deref() {
            match split_pair(param) {
                Some((field, years)) => {
                    args.push(years.to_string());
                    args.push(resolve(field));
                }
                None => args.push(resolve(split_inclusive(param).1)),
            }
        }

        let suffix = match suffix_for(spec) {
            Some(key) => Some(self.get(key)?),
            None => None,
        };

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(render_message(template, &args, suffix))
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Which suffix message, if any, applies to `spec`.
fn suffix_for(spec: &RuleSpec) -> Option<&'static str> {
    if !spec.is_inclusive() {
        return None;
    }
    match spec.name.as_str() {
        "greater_than" | "less_than" | "date_greater_than" | "date_less_than" => {
            Some(EQUALS_ADDITION)
        }
        "date_in_past" | "date_in_future" => Some(DATE_ADDITION),
        _ => None,
    }
}

/// Fill `%s` placeholders of `template` with `args` in order and append
/// `suffix` separated by a space.
///
/// Placeholders without a matching argument are left as they are.
pub fn render_message(template: &str, args: &[&str], suffix: Option<&str>) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut args = args.iter();
    let mut pieces = template.split(PLACEHOLDER).peekable();

    while let Some(piece) = pieces.next() {
        out.push_str(piece);
        if pieces.peek().is_some() {
            out.push_str(args.next().copied().unwrap_or(PLACEHOLDER));
        }
    }

    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        out.push(' ');
        out.push_str(suffix);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("start".to_string(), "Start date".to_string()),
            ("dob".to_string(), "Date of birth".to_string()),
            ("password".to_string(), "Password".to_string()),
        ])
    }

    fn render(spec: &str) -> String {
        MessageCatalog::new()
            .render(&RuleSpec::parse(spec), "Field", &names())
            .unwrap()
    }

    #[test]
    fn test_render_message_in_order() {
        assert_eq!(render_message("%s and %s", &["a", "b"], None), "a and b");
        assert_eq!(render_message("%s and %s", &["a"], None), "a and %s");
        assert_eq!(render_message("no placeholders", &["a"], None), "no placeholders");
        // Arguments are not re-scanned for placeholders
        assert_eq!(render_message("%s/%s", &["%s", "x"], None), "%s/x");
    }

    #[test]
    fn test_render_message_suffix() {
        assert_eq!(render_message("%s.", &["a"], Some("More.")), "a. More.");
        assert_eq!(render_message("%s.", &["a"], Some("")), "a.");
    }

    #[test]
    fn test_param_literal_and_field_display() {
        assert_eq!(render("required"), "The Field field is required.");
        assert_eq!(
            render("min_length[8]"),
            "The Field field must be at least 8 characters in length."
        );
        assert_eq!(render("matches[password]"), "The Field field does not match the Password field.");
        assert_eq!(render("matches[other]"), "The Field field does not match the other field.");
    }

    #[test]
    fn test_pair_param() {
        assert_eq!(
            render("years_between[dob:18]"),
            "The Field date must be 18 years after Date of birth date."
        );
    }

    #[test]
    fn test_inclusive_suffix_is_computed_per_render() {
        assert_eq!(
            render("greater_than[=5]"),
            "The Field field must contain a number greater than 5. It can be equal to it."
        );
        // No state carries over between renders
        assert_eq!(render("greater_than[5]"), "The Field field must contain a number greater than 5.");
        assert_eq!(
            render("greater_than[=5]"),
            "The Field field must contain a number greater than 5. It can be equal to it."
        );
        assert_eq!(
            render("date_greater_than[=start]"),
            "The Field date must be greater than Start date date. It can be equal to it."
        );
        assert_eq!(render("date_in_past[=]"), "The Field field must be in the past. It can be today.");
        assert_eq!(render("date_in_future"), "The Field field must be in the future.");
    }

    #[test]
    fn test_date_suffix_follows_inclusive_comparison() {
        // Any leading `=` makes the comparison inclusive, so the suffix shows too
        assert_eq!(
            render("date_in_future[=today]"),
            "The Field field must be in the future. It can be today."
        );
        assert_eq!(render("date_in_past[today]"), "The Field field must be in the past.");
    }

    #[test]
    fn test_overridden_suffix() {
        let mut catalog = MessageCatalog::new();
        catalog.set(EQUALS_ADDITION, "Or equal.");
        let message = catalog
            .render(&RuleSpec::parse("less_than[=3]"), "Qty", &HashMap::new())
            .unwrap();
        assert_eq!(message, "The Qty field must contain a number less than 3. Or equal.");
    }

    #[test]
    fn test_unknown_message() {
        let err = MessageCatalog::new()
            .render(&RuleSpec::parse("even"), "Field", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, RuleError::UnknownMessage { rule } if rule == "even"));
    }

    #[test]
    fn test_every_builtin_rule_has_a_message() {
        let catalog = MessageCatalog::new();
        for name in crate::rule::RuleRegistry::new().names() {
            assert!(catalog.contains(name), "missing message for {name}");
        }
    }
}
