// src/models/ticket.rs
//! Ticket data model.
//!
//! A ticket is the locally held record of a passenger's identity and flight
//! against which disclosed passport attributes are checked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_FLIGHT: &str = "OS123";
pub const DEFAULT_FROM: &str = "AMS";
pub const DEFAULT_TO: &str = "BCN";
pub const DEFAULT_SEAT: &str = "12A";

/// Flight metadata printed on the boarding pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetails {
    pub flight: String,
    pub from: String,
    pub to: String,
    pub seat: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub gate: String,
}

impl Default for FlightDetails {
    fn default() -> Self {
        FlightDetails {
            flight: DEFAULT_FLIGHT.into(),
            from: DEFAULT_FROM.into(),
            to: DEFAULT_TO.into(),
            seat: DEFAULT_SEAT.into(),
            date: String::new(),
            time: String::new(),
            gate: String::new(),
        }
    }
}

/// Partial flight data a client may send to override the defaults.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlightOverride {
    pub flight: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub seat: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub gate: Option<String>,
}

impl FlightOverride {
    /// Applies the non-empty overrides on top of the default flight.
    pub fn into_details(self) -> FlightDetails {
        fn pick(value: Option<String>, fallback: String) -> String {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => fallback,
            }
        }

        let defaults = FlightDetails::default();
        FlightDetails {
            flight: pick(self.flight, defaults.flight),
            from: pick(self.from, defaults.from),
            to: pick(self.to, defaults.to),
            seat: pick(self.seat, defaults.seat),
            date: pick(self.date, defaults.date),
            time: pick(self.time, defaults.time),
            gate: pick(self.gate, defaults.gate),
        }
    }
}

/// Validated ticket payload before the store assigns identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub first_name: String,
    pub last_name: String,
    /// Passport/ID document number in [`normalize_document_number`] form.
    pub document_number: String,
    pub flight: FlightDetails,
}

impl NewTicket {
    /// Normalizes raw passenger input. Returns `None` if any identity field is
    /// empty after trimming.
    pub fn normalized(
        first_name: &str,
        last_name: &str,
        document_number: &str,
        flight: FlightDetails,
    ) -> Option<Self> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        let document_number = normalize_document_number(document_number);
        if first_name.is_empty() || last_name.is_empty() || document_number.is_empty() {
            return None;
        }
        Some(NewTicket {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            document_number,
            flight,
        })
    }
}

/// A stored ticket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// 128-bit random identifier, hex encoded
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    #[serde(flatten)]
    pub flight: FlightDetails,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Case-insensitive comparison of claimed passenger data with the ticket.
    pub fn matches_passenger(&self, first_name: &str, last_name: &str, document_number: &str) -> bool {
        eq_ignore_case(&self.first_name, first_name.trim())
            && eq_ignore_case(&self.last_name, last_name.trim())
            && self.matches_document(document_number)
    }

    /// Case-insensitive comparison against a disclosed document number.
    pub fn matches_document(&self, disclosed: &str) -> bool {
        normalize_document_number(&self.document_number) == normalize_document_number(disclosed)
    }
}

/// Canonical document number form: whitespace removed, upper-cased.
pub fn normalize_document_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> Ticket {
        Ticket {
            id: "abc".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            document_number: "AB1234567".into(),
            flight: FlightDetails::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalized_uppercases_document() {
        let t = NewTicket::normalized(" Ada ", "Lovelace", " ab12 34567 ", FlightDetails::default()).unwrap();
        assert_eq!(t.first_name, "Ada");
        assert_eq!(t.document_number, "AB1234567");
    }

    #[test]
    fn test_normalized_rejects_blank_fields() {
        assert!(NewTicket::normalized("Ada", "  ", "AB1", FlightDetails::default()).is_none());
        assert!(NewTicket::normalized("Ada", "Lovelace", "", FlightDetails::default()).is_none());
    }

    #[test]
    fn test_matches_passenger_is_case_insensitive() {
        let t = ticket();
        assert!(t.matches_passenger("ada", "LOVELACE", "ab1234567"));
        assert!(!t.matches_passenger("Ada", "Byron", "AB1234567"));
    }

    #[test]
    fn test_flight_override_keeps_defaults_for_blanks() {
        let details = FlightOverride {
            flight: Some("KL1001".into()),
            seat: Some("  ".into()),
            gate: Some("D7".into()),
            ..FlightOverride::default()
        }
        .into_details();
        assert_eq!(details.flight, "KL1001");
        assert_eq!(details.seat, DEFAULT_SEAT);
        assert_eq!(details.from, DEFAULT_FROM);
        assert_eq!(details.gate, "D7");
    }

    #[test]
    fn test_ticket_serializes_flat_camel_case() {
        let json = serde_json::to_value(ticket()).unwrap();
        assert_eq!(json["documentNumber"], "AB1234567");
        assert_eq!(json["flight"], DEFAULT_FLIGHT);
        assert!(json.get("createdAt").is_some());
    }
}
