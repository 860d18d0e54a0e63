//! Built-in rules.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Datelike;
use email_address::EmailAddress;
use regex::Regex;
use url::Url;

use super::{RuleInput, RuleRegistry, split_inclusive, split_pair};
use crate::date::{years_between as year_diff, years_since};
use crate::field::FieldRecord;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| regex(r"^[0-9]+$"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| regex(r"^-?[0-9]+$"));
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| regex(r"^-?[0-9]*\.?[0-9]+$"));
static NATURAL_NO_ZERO: LazyLock<Regex> = LazyLock::new(|| regex(r"^[1-9][0-9]*$"));
static ALPHA: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^[a-z]+$"));
static ALPHA_NUMERIC: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^[a-z0-9]+$"));
static ALPHA_DASH: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)^[a-z0-9_\-]+$"));
static IP: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^((25[0-5]|2[0-4][0-9]|1[0-9]{2}|[0-9]{1,2})\.){3}(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[0-9]{1,2})$")
});
static NUMERIC_DASH: LazyLock<Regex> = LazyLock::new(|| regex(r"^[\d\-\s]+$"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| regex(r"^\d{4}$"));
static UK_POSTCODE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)[a-z]{1,2}[0-9]{1,2} ?[0-9][a-z]{2}"));
static UK_PHONE: LazyLock<Regex> = LazyLock::new(|| regex(r"^((\+44)|0)( ?[0-9]{3,4}){3}$"));

pub(super) fn install(registry: &mut RuleRegistry) {
    registry.register("required", required);
    registry.register("matches", matches);
    registry.register("min_length", |i| length(i, |len, n| len >= n));
    registry.register("max_length", |i| length(i, |len, n| len <= n));
    registry.register("exact_length", |i| length(i, |len, n| len == n));
    registry.register("greater_than", |i| compare_number(i, |v, p, eq| if eq { v >= p } else { v > p }));
    registry.register("less_than", |i| compare_number(i, |v, p, eq| if eq { v <= p } else { v < p }));
    registry.register("alpha", |i| ALPHA.is_match(&i.text()));
    registry.register("alpha_numeric", |i| ALPHA_NUMERIC.is_match(&i.text()));
    registry.register("alpha_dash", |i| ALPHA_DASH.is_match(&i.text()));
    registry.register("numeric", |i| NUMERIC.is_match(&i.text()));
    registry.register("integer", |i| INTEGER.is_match(&i.text()));
    registry.register("decimal", |i| DECIMAL.is_match(&i.text()));
    registry.register("is_natural", |i| NUMERIC.is_match(&i.text()));
    registry.register("is_natural_no_zero", |i| NATURAL_NO_ZERO.is_match(&i.text()));
    registry.register("valid_ip", |i| IP.is_match(&i.text()));
    registry.register("valid_base64", valid_base64);
    registry.register("valid_credit_card", |i| luhn(&i.text()));
    registry.register("is_year", |i| YEAR.is_match(&i.text()));
    registry.register("year_in_past", year_in_past);
    registry.register("years_between", years_between);
    registry.register("min_years_in_past", |i| years_in_past(i, |years, n| years >= n));
    registry.register("max_years_in_past", |i| years_in_past(i, |years, n| years <= n));
    registry.register("valid_date", |i| i.parse_date(&i.text()).is_some());
    registry.register("date_in_past", |i| compare_today(i, |d, t, eq| if eq { d <= t } else { d < t }));
    registry.register("date_in_future", |i| compare_today(i, |d, t, eq| if eq { d >= t } else { d > t }));
    registry.register("date_greater_than", |i| compare_dates(i, |d, o, eq| if eq { d >= o } else { d > o }));
    registry.register("date_less_than", |i| compare_dates(i, |d, o, eq| if eq { d <= o } else { d < o }));
    registry.register("valid_email", valid_email);
    registry.register("uk_postcode", uk_postcode);
    registry.register("uk_phonenumber", |i| UK_PHONE.is_match(&i.text()));
    registry.register("valid_url", valid_url);
}

/// State of a field referenced by a cross-field rule.
enum Reference<'a> {
    /// No such field in the session.
    Missing,
    /// Not visited yet or still empty: the dependency cannot be violated yet.
    Unfilled,
    Ready(&'a FieldRecord),
}

fn reference<'a>(input: &RuleInput<'a>, name: &str) -> Reference<'a> {
    match input.other(name) {
        None => {
            log::warn!(
                "[rules] field '{}' references unknown field '{}'",
                input.field.name,
                name
            );
            Reference::Missing
        }
        Some(other) if !other.visited || other.value.is_empty() => Reference::Unfilled,
        Some(other) => Reference::Ready(other),
    }
}

fn required(input: &RuleInput<'_>) -> bool {
    if input.field.kind.is_group() {
        return input.field.checked == Some(true);
    }
    !input.field.value.is_empty()
}

fn matches(input: &RuleInput<'_>) -> bool {
    let Some(name) = input.param else {
        return false;
    };
    match reference(input, name) {
        Reference::Missing => false,
        Reference::Unfilled => true,
        Reference::Ready(other) => input.field.value == other.value,
    }
}

fn length(input: &RuleInput<'_>, cmp: fn(usize, usize) -> bool) -> bool {
    let Some(n) = input
        .param
        .filter(|p| NUMERIC.is_match(p))
        .and_then(|p| p.parse::<usize>().ok())
    else {
        return false;
    };
    if input.field.value.is_null() {
        return false;
    }
    cmp(input.text().chars().count(), n)
}

fn compare_number(input: &RuleInput<'_>, cmp: fn(f64, f64, bool) -> bool) -> bool {
    let text = input.text();
    if !DECIMAL.is_match(&text) {
        return false;
    }
    let Some((inclusive, bound)) = input.param.map(split_inclusive) else {
        return false;
    };
    match (text.parse::<f64>(), bound.trim().parse::<f64>()) {
        (Ok(value), Ok(bound)) => cmp(value, bound, inclusive),
        _ => false,
    }
}

fn valid_base64(input: &RuleInput<'_>) -> bool {
    let text = input.text();
    !text.is_empty() && STANDARD.decode(text.as_bytes()).is_ok()
}

fn luhn(value: &str) -> bool {
    if !NUMERIC_DASH.is_match(value) {
        return false;
    }
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.is_empty() {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn year_in_past(input: &RuleInput<'_>) -> bool {
    input
        .text()
        .trim()
        .parse::<i32>()
        .is_ok_and(|year| year <= input.today.year())
}

fn years_between(input: &RuleInput<'_>) -> bool {
    let Some((name, years)) = input.param.and_then(split_pair) else {
        log::warn!(
            "[rules] years_between on '{}' expects a [field:years] parameter",
            input.field.name
        );
        return false;
    };
    let other = match reference(input, name) {
        Reference::Missing => return false,
        Reference::Unfilled => return true,
        Reference::Ready(other) => other,
    };
    let Ok(years) = years.trim().parse::<f64>() else {
        return false;
    };
    match (input.parse_date(&input.text()), input.parse_date(&other.value.as_text())) {
        (Some(date), Some(other_date)) => year_diff(date, other_date) >= years,
        _ => false,
    }
}

fn years_in_past(input: &RuleInput<'_>, cmp: fn(f64, f64) -> bool) -> bool {
    let Some(bound) = input.param.and_then(|p| p.trim().parse::<f64>().ok()) else {
        return false;
    };
    input
        .parse_date(&input.text())
        .is_some_and(|date| cmp(years_since(date, input.today), bound))
}

fn compare_today(
    input: &RuleInput<'_>,
    cmp: fn(chrono::NaiveDate, chrono::NaiveDate, bool) -> bool,
) -> bool {
    let inclusive = input.param.is_some_and(|p| split_inclusive(p).0);
    input
        .parse_date(&input.text())
        .is_some_and(|date| cmp(date, input.today, inclusive))
}

fn compare_dates(
    input: &RuleInput<'_>,
    cmp: fn(chrono::NaiveDate, chrono::NaiveDate, bool) -> bool,
) -> bool {
    let Some((inclusive, name)) = input.param.map(split_inclusive) else {
        return false;
    };
    let other = match reference(input, name) {
        Reference::Missing => return false,
        Reference::Unfilled => return true,
        Reference::Ready(other) => other,
    };
    match (input.parse_date(&input.text()), input.parse_date(&other.value.as_text())) {
        (Some(date), Some(other_date)) => cmp(date, other_date, inclusive),
        _ => false,
    }
}

fn valid_email(input: &RuleInput<'_>) -> bool {
    input
        .text()
        .parse::<EmailAddress>()
        .is_ok_and(|email| {
            email
                .domain()
                .rsplit_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        })
}

fn uk_postcode(input: &RuleInput<'_>) -> bool {
    let text = input.text();
    let compact = text.chars().filter(|c| !c.is_whitespace()).count();
    (5..=7).contains(&compact) && UK_POSTCODE.is_match(&text)
}

fn valid_url(input: &RuleInput<'_>) -> bool {
    Url::parse(&input.text()).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    })
}
