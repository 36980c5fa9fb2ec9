// src/models/credential.rs
//! Issuance request data model.
//!
//! Defines the payload returned to the verifier at the end of a chained
//! session, asking it to issue a boarding pass credential to the holder.

use serde::Serialize;
use std::collections::BTreeMap;

pub const ISSUANCE_CONTEXT: &str = "https://irma.app/ld/request/issuance/v2";

/// One credential to issue: its type identifier and attribute values.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CredentialRequest {
    /// Example: "irma-demo.demo-airline.boardingpass"
    pub credential: String,

    /// Attribute name to value, serialized in stable key order
    pub attributes: BTreeMap<String, String>,
}

/// Issuance session request.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IssuanceRequest {
    #[serde(rename = "@context")]
    pub context: String,
    pub credentials: Vec<CredentialRequest>,
}

impl IssuanceRequest {
    pub fn new(credentials: Vec<CredentialRequest>) -> Self {
        IssuanceRequest {
            context: ISSUANCE_CONTEXT.to_string(),
            credentials,
        }
    }
}
