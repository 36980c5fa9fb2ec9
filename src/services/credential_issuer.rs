// src/services/credential_issuer.rs
//! Boarding pass issuance.
//!
//! Builds the issuance request handed back to the verifier when a chained
//! disclosure session ends in a verified match. Attribute values always come
//! from the stored ticket, never from the disclosure payload.

use crate::models::credential::{CredentialRequest, IssuanceRequest};
use crate::models::ticket::Ticket;
use std::collections::BTreeMap;

/// Issues boarding pass credentials of one configured credential type.
pub struct CredentialIssuer {
    /// Example: "irma-demo.demo-airline.boardingpass"
    credential_type: String,
}

impl CredentialIssuer {
    pub fn new(credential_type: impl Into<String>) -> Self {
        Self {
            credential_type: credential_type.into(),
        }
    }

    /// Issuance request for the boarding pass of `ticket`.
    pub fn boarding_pass(&self, ticket: &Ticket) -> IssuanceRequest {
        let flight = &ticket.flight;
        let attributes: BTreeMap<String, String> = [
            ("firstname", &ticket.first_name),
            ("lastname", &ticket.last_name),
            ("flight", &flight.flight),
            ("from", &flight.from),
            ("to", &flight.to),
            ("seat", &flight.seat),
            ("date", &flight.date),
            ("time", &flight.time),
            ("gate", &flight.gate),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

        IssuanceRequest::new(vec![CredentialRequest {
            credential: self.credential_type.clone(),
            attributes,
        }])
    }
}
