// src/models/disclosure.rs
//! Disclosure session result as reported by the verifier.
//!
//! Parsed, never owned: the raw JSON is passed back to clients untouched and
//! this typed view is only used for matching. Every field is lenient so a
//! partially malformed result degrades to "nothing disclosed" instead of a
//! parse failure: a value of the wrong type reads as empty, and a record that
//! is not an object is skipped.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Session status reported once the holder finished the session.
pub const STATUS_DONE: &str = "DONE";
/// Proof status for a cryptographically valid disclosure.
pub const PROOF_STATUS_VALID: &str = "VALID";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DisclosureResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(rename = "proofStatus", default, deserialize_with = "lenient_string")]
    pub proof_status: String,

    #[serde(rename = "error", alias = "err", default, deserialize_with = "lenient_error")]
    pub error: Option<RemoteError>,

    /// Attribute groups in request order. Null and non-object records are dropped.
    #[serde(default, deserialize_with = "lenient_groups")]
    pub disclosed: Vec<Vec<DisclosedAttribute>>,
}

impl DisclosureResult {
    pub fn is_done(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_DONE)
    }

    pub fn is_proof_valid(&self) -> bool {
        self.proof_status.eq_ignore_ascii_case(PROOF_STATUS_VALID)
    }

    /// Iterates disclosed records group by group.
    pub fn attributes(&self) -> impl Iterator<Item = &DisclosedAttribute> {
        self.disclosed.iter().flatten()
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RemoteError {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

impl RemoteError {
    pub fn text(&self) -> &str {
        if self.message.is_empty() {
            &self.description
        } else {
            &self.message
        }
    }
}

/// One disclosed attribute. The value may arrive under several keys.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct DisclosedAttribute {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub rawvalue: Option<String>,

    #[serde(rename = "rawValue", default, deserialize_with = "lenient_opt_string")]
    pub raw_value: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Accepts `{"message", "description"}` objects as well as a bare string.
fn lenient_error<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<RemoteError>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(message) => Some(RemoteError {
            message,
            description: String::new(),
        }),
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    })
}

fn lenient_groups<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Vec<DisclosedAttribute>>, D::Error> {
    let Value::Array(groups) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(groups
        .into_iter()
        .map(|group| match group {
            Value::Array(records) => records
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|record| serde_json::from_value(record).ok())
                .collect(),
            _ => Vec::new(),
        })
        .collect())
}
