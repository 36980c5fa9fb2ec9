// src/models/session_request.rs
//! Session requests exchanged with the verifier.
//!
//! A disclosure request asks the holder for one attribute; wrapped in a
//! service-provider request it also carries the `nextSession` callback that
//! chains the disclosure into the boarding pass issuance.

use serde::{Deserialize, Serialize};

pub const DISCLOSURE_CONTEXT: &str = "https://irma.app/ld/request/disclosure/v2";

/// Attribute condiscon: an AND of ORs of ANDs of attribute identifiers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DisclosureRequest {
    #[serde(rename = "@context")]
    pub context: String,
    pub disclose: Vec<Vec<Vec<String>>>,
}

impl DisclosureRequest {
    /// Request disclosure of exactly one attribute.
    pub fn single(attribute: impl Into<String>) -> Self {
        DisclosureRequest {
            context: DISCLOSURE_CONTEXT.to_string(),
            disclose: vec![vec![vec![attribute.into()]]],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NextSession {
    pub url: String,
}

/// The `sprequest` claim of a signed requestor JWT.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ServiceProviderRequest {
    pub request: DisclosureRequest,
    #[serde(rename = "nextSession", skip_serializing_if = "Option::is_none")]
    pub next_session: Option<NextSession>,
}

impl ServiceProviderRequest {
    pub fn chained(request: DisclosureRequest, callback_url: impl Into<String>) -> Self {
        ServiceProviderRequest {
            request,
            next_session: Some(NextSession { url: callback_url.into() }),
        }
    }
}

/// Claims of the requestor JWT posted to the verifier.
#[derive(Serialize, Debug, Clone)]
pub struct RequestorClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub sprequest: ServiceProviderRequest,
}

/// Verifier response to a session start.
#[derive(Deserialize, Debug, Clone)]
pub struct SessionPackage {
    pub token: String,
    /// Opaque pointer for the holder app; its `u` URL ends in the session id.
    #[serde(rename = "sessionPtr")]
    pub session_ptr: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chained_request_shape() {
        let req = ServiceProviderRequest::chained(
            DisclosureRequest::single("pbdf-staging.pbdf.passport.documentNumber"),
            "https://airline.example/api/irma/callback?ticketId=abc",
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "request": {
                    "@context": DISCLOSURE_CONTEXT,
                    "disclose": [[["pbdf-staging.pbdf.passport.documentNumber"]]]
                },
                "nextSession": { "url": "https://airline.example/api/irma/callback?ticketId=abc" }
            })
        );
    }

    #[test]
    fn test_session_package_keeps_pointer_opaque() {
        let sp: SessionPackage = serde_json::from_value(json!({
            "token": "tok",
            "sessionPtr": { "u": "https://irma/irma/session/xyz", "irmaqr": "disclosing" },
            "frontendRequest": { "authorization": "a" }
        }))
        .unwrap();
        assert_eq!(sp.token, "tok");
        assert_eq!(sp.session_ptr["irmaqr"], "disclosing");
    }
}
