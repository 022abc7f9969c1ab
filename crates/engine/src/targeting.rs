//! Targeting evaluator — pure predicate over a captured page context and
//! a widget's rule set. No I/O, no clock, no logging.
//!
//! Semantics: an empty rule array for a category always matches; a
//! non-empty array matches if any rule in it matches; the overall result
//! is the AND across the three categories. A malformed rule (e.g. a
//! non-numeric operand for a numeric comparator) evaluates to false
//! instead of failing the whole rule set.

use crate::types::PageContext;
use popreach_core::types::{MatchType, TargetingRule, TargetingSettings};

/// Evaluates the page rules of `settings` against `ctx`.
pub fn matches(ctx: &PageContext, settings: &TargetingSettings) -> bool {
    let path = normalize_path(&ctx.path);

    category_matches(&settings.page_url, |rule| {
        rule_matches(&normalize_path(&rule.value), &path, rule.match_type)
    }) && category_matches(&settings.page_title, |rule| {
        rule_matches(&rule.value, &ctx.title, rule.match_type)
    }) && category_matches(&settings.js_variable, |rule| {
        let actual = rule
            .name
            .as_deref()
            .and_then(|name| ctx.js_globals.get(name))
            .map(js_value_to_string)
            .unwrap_or_default();
        rule_matches(&rule.value, &actual, rule.match_type)
    })
}

/// Vacuous true for an empty category, OR across its rules otherwise.
fn category_matches<F>(rules: &[TargetingRule], pred: F) -> bool
where
    F: Fn(&TargetingRule) -> bool,
{
    rules.is_empty() || rules.iter().any(pred)
}

fn rule_matches(expected: &str, actual: &str, match_type: MatchType) -> bool {
    match match_type {
        MatchType::Exact => actual == expected,
        MatchType::Equals => loose_equals(actual, expected),
        MatchType::Contains => actual.contains(expected),
        MatchType::StartsWith => actual.starts_with(expected),
        MatchType::EndsWith => actual.ends_with(expected),
        MatchType::NotContains => !actual.contains(expected),
        MatchType::GreaterThan => numeric_compare(actual, expected, |a, b| a > b),
        MatchType::LessThan => numeric_compare(actual, expected, |a, b| a < b),
    }
}

/// Numeric equality when both operands parse as floats (so `"42"` equals
/// `"42.0"`), plain string equality otherwise.
fn loose_equals(actual: &str, expected: &str) -> bool {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => actual == expected,
    }
}

/// Both operands must parse as floats; anything else fails the rule.
fn numeric_compare<F>(actual: &str, expected: &str, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

/// Trailing slashes are insignificant (`/a/` ≡ `/a`) except for the root
/// path itself.
fn normalize_path(path: &str) -> String {
    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn js_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
