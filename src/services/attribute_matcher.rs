// src/services/attribute_matcher.rs
//! Extraction of the disclosed document number from a session result.
//!
//! Verifiers are not consistent about key casing, so the value of a matching
//! record is resolved through a fixed fallback chain:
//! 1. `rawvalue`
//! 2. `rawValue`
//! 3. `value`, coerced to a string (a translated-string map yields its
//!    English or first non-empty entry)

use crate::models::disclosure::{DisclosedAttribute, DisclosureResult};
use crate::models::ticket::normalize_document_number;
use serde_json::Value;

/// Extracts the disclosed document number.
///
/// # Arguments
/// * `result` - Parsed disclosure result
/// * `expected_attribute` - Fully qualified attribute identifier, compared
///   case-insensitively
///
/// # Returns
/// - `Some(value)`: the first non-empty normalized value, scanning groups and
///   records in order
/// - `None` if no matching record carries a value. Never fails.
pub fn extract_document_number(result: &DisclosureResult, expected_attribute: &str) -> Option<String> {
    result
        .attributes()
        .filter(|attr| attr.id.eq_ignore_ascii_case(expected_attribute))
        .filter_map(resolve_value)
        .map(|raw| normalize_document_number(&raw))
        .find(|value| !value.is_empty())
}

fn resolve_value(attr: &DisclosedAttribute) -> Option<String> {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

    non_empty(&attr.rawvalue)
        .or_else(|| non_empty(&attr.raw_value))
        .or_else(|| attr.value.as_ref().and_then(coerce_to_string))
}

fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map
            .get("en")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                map.values()
                    .filter_map(Value::as_str)
                    .find(|s| !s.trim().is_empty())
            })
            .map(str::to_string),
        Value::Null | Value::Array(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ATTR: &str = "pbdf-staging.pbdf.passport.documentNumber";

    fn result(disclosed: Value) -> DisclosureResult {
        serde_json::from_value(json!({
            "status": "DONE",
            "proofStatus": "VALID",
            "disclosed": disclosed,
        }))
        .unwrap()
    }

    #[test]
    fn test_extracts_and_normalizes_raw_value() {
        let res = result(json!([[{"id": "a.b.c", "rawvalue": "X12 34"}]]));
        assert_eq!(extract_document_number(&res, "a.b.c").as_deref(), Some("X1234"));

        let res = result(json!([[{"id": ATTR, "rawvalue": "  ab1234567 "}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("AB1234567"));
    }

    #[test]
    fn test_identifier_match_is_case_insensitive() {
        let res = result(json!([[{"id": ATTR.to_uppercase(), "rawvalue": "ab1"}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("AB1"));
    }

    #[test]
    fn test_no_matching_identifier() {
        let res = result(json!([[{"id": "other.attr", "rawvalue": "AB1"}]]));
        assert_eq!(extract_document_number(&res, ATTR), None);
        assert_eq!(extract_document_number(&DisclosureResult::default(), ATTR), None);
    }

    #[test]
    fn test_fallback_chain_order() {
        let res = result(json!([[{"id": ATTR, "rawValue": "camel", "value": "generic"}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("CAMEL"));

        let res = result(json!([[{"id": ATTR, "rawvalue": "", "value": {"en": "p123", "nl": "p123"}}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("P123"));

        let res = result(json!([[{"id": ATTR, "value": 42}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("42"));
    }

    #[test]
    fn test_first_non_empty_candidate_wins() {
        let res = result(json!([
            [{"id": ATTR, "rawvalue": "   "}, null],
            [{"id": "x.y", "rawvalue": "NOPE"}, {"id": ATTR, "rawvalue": "second"}],
            [{"id": ATTR, "rawvalue": "third"}]
        ]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("SECOND"));
    }

    #[test]
    fn test_wrong_typed_record_does_not_hide_a_match() {
        let res = result(json!([[
            {"id": "other.attr", "rawvalue": 42},
            {"id": ATTR, "rawvalue": "AB1234567"}
        ]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("AB1234567"));

        // a non-string raw value on the matching record falls through to `value`
        let res = result(json!([[{"id": ATTR, "rawvalue": 42, "value": "ab1"}]]));
        assert_eq!(extract_document_number(&res, ATTR).as_deref(), Some("AB1"));
    }
}
