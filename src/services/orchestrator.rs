// src/services/orchestrator.rs
//! Verification and issuance state machine.
//!
//! ```text
//! TICKET_CREATED -> SESSION_STARTED -> AWAITING_RESULT -> VERIFIED | MISMATCHED | FAILED -> CONSUMED
//! ```
//!
//! [`SessionOrchestrator::start`] pre-checks the passenger's claims against
//! the stored ticket, then starts a chained disclosure session at the verifier
//! and records `session -> token` and `session -> ticket`.
//! [`SessionOrchestrator::result`] fetches the outcome and, the first time
//! only, matches the disclosed document number against the linked ticket.
//! [`SessionOrchestrator::callback`] handles the verifier's chained-session
//! call and answers with a boarding pass issuance request on a match.
//!
//! No lock is held across a verifier call; the stores are only touched
//! between awaits.

use crate::config::CredentialConfig;
use crate::error::{SessionError, SigningError, StoreError, VerifierError};
use crate::models::credential::IssuanceRequest;
use crate::models::disclosure::DisclosureResult;
use crate::models::session_request::{DisclosureRequest, ServiceProviderRequest};
use crate::models::ticket::Ticket;
use crate::services::attribute_matcher::extract_document_number;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::verifier::VerifierClient;
use crate::storage::session_tracker::SessionTracker;
use crate::storage::ticket_store::TicketStore;
use crate::storage::token_storage::TokenStorage;
use crate::utils::crypto::{decode_result_jwt, RequestSigner};
use crate::utils::url_helpers::{callback_url, session_id_from_pointer};
use reqwest::Url;
use serde::Serialize;
use std::sync::Arc;

pub const MSG_MISMATCH: &str = "passport data does not match ticket";
pub const MSG_NOT_DISCLOSED: &str = "required attribute not disclosed";

/// Passenger data claimed by the client when asking to verify a ticket.
#[derive(Debug, Clone)]
pub struct PassengerClaim {
    pub ticket_id: String,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
}

/// Returned to the client to render the QR code / deep link.
#[derive(Serialize, Debug, Clone)]
pub struct StartedSession {
    #[serde(rename = "sessionPtr")]
    pub session_ptr: serde_json::Value,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Answer to a result poll.
#[derive(Serialize, Debug, Clone)]
pub struct VerificationOutcome {
    #[serde(rename = "sessionResult")]
    pub session_result: serde_json::Value,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Terminal verdict of a disclosure result against a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Verified,
    Mismatched,
    NotDisclosed,
    /// The verifier reported an explicit error.
    Failed(String),
    /// Not done, or proof not valid, without an error message.
    Incomplete,
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }

    /// Human-readable message for the client. Never reveals the expected value.
    pub fn message(&self) -> Option<String> {
        match self {
            Verdict::Verified | Verdict::Incomplete => None,
            Verdict::Mismatched => Some(MSG_MISMATCH.to_string()),
            Verdict::NotDisclosed => Some(MSG_NOT_DISCLOSED.to_string()),
            Verdict::Failed(message) => Some(message.clone()),
        }
    }
}

/// Evaluates a disclosure result against the ticket it was opened for.
///
/// # Arguments
/// * `result` - Parsed disclosure result
/// * `expected_attribute` - Fully qualified document number attribute
/// * `ticket` - The ticket the session was opened for
///
/// # Returns
/// A protocol error wins over everything else; an unfinished or invalid
/// proof is [`Verdict::Incomplete`]; otherwise the matcher decides
pub fn evaluate(result: &DisclosureResult, expected_attribute: &str, ticket: &Ticket) -> Verdict {
    if let Some(error) = &result.error {
        return Verdict::Failed(error.text().to_string());
    }
    if !result.is_done() || !result.is_proof_valid() {
        return Verdict::Incomplete;
    }
    match extract_document_number(result, expected_attribute) {
        None => Verdict::NotDisclosed,
        Some(disclosed) if ticket.matches_document(&disclosed) => Verdict::Verified,
        Some(_) => Verdict::Mismatched,
    }
}

/// Verification/issuance state machine over the three stores.
pub struct SessionOrchestrator {
    tickets: Arc<TicketStore>,
    tokens: Arc<dyn TokenStorage>,
    tracker: Arc<SessionTracker>,
    verifier: VerifierClient,
    issuer: CredentialIssuer,
    credential_config: CredentialConfig,
}

impl SessionOrchestrator {
    /// Creates the orchestrator
    ///
    /// # Arguments
    /// * `tickets` - Ticket registry
    /// * `tokens` - Backend chosen by [`crate::storage::token_storage::token_storage_from_config`]
    /// * `tracker` - One-shot session-to-ticket links
    /// * `verifier` - Client for the external verifier
    /// * `credential_config` - Expected attribute, signing key and issued credential type
    pub fn new(
        tickets: Arc<TicketStore>,
        tokens: Arc<dyn TokenStorage>,
        tracker: Arc<SessionTracker>,
        verifier: VerifierClient,
        credential_config: CredentialConfig,
    ) -> Self {
        let issuer = CredentialIssuer::new(credential_config.boarding_pass_credential.clone());
        Self {
            tickets,
            tokens,
            tracker,
            verifier,
            issuer,
            credential_config,
        }
    }

    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }

    /// Starts a chained disclosure session for the claimed ticket.
    ///
    /// The claim is checked before anything else; on a mismatch the verifier
    /// is never contacted and nothing is stored.
    ///
    /// # Arguments
    /// * `claim` - Ticket id and the identity the passenger claims
    /// * `public_base` - Externally reachable base URL for the callback
    ///
    /// # Returns
    /// - `Ok(StartedSession)` with the pointer to render and the session id
    /// - `Err(SessionError::TicketMismatch)` if the claim does not match
    /// - `Err` for an unknown ticket, key problems or verifier failures
    pub async fn start(&self, claim: &PassengerClaim, public_base: &Url) -> Result<StartedSession, SessionError> {
        let ticket = self.tickets.get(&claim.ticket_id)?;
        if !ticket.matches_passenger(&claim.first_name, &claim.last_name, &claim.document_number) {
            log::warn!("passenger claim does not match ticket {}", ticket.id);
            return Err(SessionError::TicketMismatch(ticket.id));
        }

        let request = ServiceProviderRequest::chained(
            DisclosureRequest::single(self.credential_config.expected_attribute()),
            callback_url(public_base, &ticket.id),
        );
        let signer = RequestSigner::from_pem_file(
            &self.credential_config.private_key_path,
            self.credential_config.requestor_id.clone(),
        )
        .await?;
        let jwt = signer.sign(&request)?;

        let package = self.verifier.start_session(jwt).await?;
        let session_id = session_id_from_pointer(&package.session_ptr).ok_or_else(|| {
            VerifierError::Malformed(format!("no session id in pointer {}", package.session_ptr))
        })?;

        self.tokens.store_token(&session_id, &package.token).await?;
        self.tracker.link(&session_id, &ticket.id);
        log::info!("started chained disclosure session {} for ticket {}", session_id, ticket.id);

        Ok(StartedSession {
            session_ptr: package.session_ptr,
            session_id,
        })
    }

    /// Fetches the session result and, on the first call for a linked
    /// session, decides whether it verifies the ticket.
    ///
    /// Later calls return the raw result with `verified == false`: the link
    /// is consumed, so a repeated poll is never a repeated confirmation.
    ///
    /// # Arguments
    /// * `session_id` - Session identifier returned by [`Self::start`]
    ///
    /// # Returns
    /// - `Ok(VerificationOutcome)` carrying the raw result and the verdict
    /// - `Err(SessionError::InvalidSession)` if no token is stored
    /// - `Err(SessionError::Verifier)` if the verifier call or parse fails
    pub async fn result(&self, session_id: &str) -> Result<VerificationOutcome, SessionError> {
        let token = self
            .tokens
            .retrieve_token(session_id)
            .await
            .map_err(|e| unknown_session(session_id, e))?;

        let session_result = self.verifier.session_result(&token).await?;
        let mut outcome = VerificationOutcome {
            session_result,
            verified: false,
            message: None,
        };

        // parsed before the link is taken so an unreadable result never consumes it
        let result: DisclosureResult = serde_json::from_value(outcome.session_result.clone())
            .map_err(VerifierError::from)?;

        let Some(ticket_id) = self.tracker.take(session_id) else {
            log::debug!("session {} has no ticket link, returning raw result", session_id);
            return Ok(outcome);
        };

        let ticket = self
            .tickets
            .get(&ticket_id)
            .map_err(|_| SessionError::LinkedTicketMissing(ticket_id.clone()))?;

        let verdict = evaluate(&result, &self.credential_config.expected_attribute(), &ticket);
        log::info!("session {} for ticket {}: {:?}", session_id, ticket_id, verdict);

        outcome.verified = verdict.is_verified();
        outcome.message = verdict.message();
        Ok(outcome)
    }

    /// Handles the verifier's chained-session callback.
    ///
    /// The verdict is re-derived from the disclosed attributes in the result
    /// JWT. Returns the issuance request on a verified match and `None`
    /// otherwise, so the caller can answer 200 either way.
    ///
    /// # Arguments
    /// * `ticket_id` - Ticket id carried in the callback URL
    /// * `result_jwt` - Session result JWT as posted by the verifier
    pub async fn callback(&self, ticket_id: &str, result_jwt: &str) -> Result<Option<IssuanceRequest>, SessionError> {
        let public_key = match &self.credential_config.verifier_public_key_path {
            Some(path) => Some(tokio::fs::read(path).await.map_err(|source| {
                SigningError::KeyUnreadable {
                    path: path.clone(),
                    source,
                }
            })?),
            None => {
                log::warn!("no verifier public key configured, accepting unverified callback JWT");
                None
            }
        };
        let result: DisclosureResult = decode_result_jwt(result_jwt, public_key.as_deref())?;
        let ticket = self.tickets.get(ticket_id)?;

        match evaluate(&result, &self.credential_config.expected_attribute(), &ticket) {
            Verdict::Verified => {
                log::info!("issuing boarding pass for ticket {}", ticket.id);
                Ok(Some(self.issuer.boarding_pass(&ticket)))
            }
            verdict => {
                log::warn!("callback for ticket {} not verified: {:?}", ticket.id, verdict);
                Ok(None)
            }
        }
    }

    /// Closes a session: consumes its token exactly once and drops any
    /// remaining ticket link.
    pub async fn close(&self, session_id: &str) -> Result<(), SessionError> {
        self.tracker.remove(session_id);
        self.tokens
            .remove_token(session_id)
            .await
            .map_err(|e| unknown_session(session_id, e))
    }
}

/// A missing token means an unknown, expired or already closed session;
/// any other storage failure stays internal.
fn unknown_session(session_id: &str, err: StoreError) -> SessionError {
    match err {
        StoreError::TokenNotFound(_) => SessionError::InvalidSession(session_id.to_string()),
        other => SessionError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::FlightDetails;
    use chrono::Utc;
    use serde_json::json;

    const ATTR: &str = "pbdf-staging.pbdf.passport.documentNumber";

    fn ticket() -> Ticket {
        Ticket {
            id: "t1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            document_number: "AB1234567".into(),
            flight: FlightDetails::default(),
            created_at: Utc::now(),
        }
    }

    fn result(value: serde_json::Value) -> DisclosureResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_matching_disclosure_is_verified() {
        let res = result(json!({
            "status": "DONE", "proofStatus": "VALID",
            "disclosed": [[{"id": ATTR, "rawvalue": "ab1234567"}]]
        }));
        assert_eq!(evaluate(&res, ATTR, &ticket()), Verdict::Verified);
    }

    #[test]
    fn test_lowercase_status_markers_are_accepted() {
        let res = result(json!({
            "status": "done", "proofStatus": "valid",
            "disclosed": [[{"id": ATTR, "rawvalue": "AB1234567"}]]
        }));
        assert!(evaluate(&res, ATTR, &ticket()).is_verified());
    }

    #[test]
    fn test_mismatch_message_does_not_leak_expected_value() {
        let res = result(json!({
            "status": "DONE", "proofStatus": "VALID",
            "disclosed": [[{"id": ATTR, "rawvalue": "ZZ0000000"}]]
        }));
        let verdict = evaluate(&res, ATTR, &ticket());
        assert_eq!(verdict, Verdict::Mismatched);
        let message = verdict.message().unwrap();
        assert!(!message.contains("AB1234567"));
    }

    #[test]
    fn test_missing_attribute() {
        let res = result(json!({"status": "DONE", "proofStatus": "VALID", "disclosed": [[]]}));
        assert_eq!(evaluate(&res, ATTR, &ticket()), Verdict::NotDisclosed);
        assert_eq!(Verdict::NotDisclosed.message().as_deref(), Some(MSG_NOT_DISCLOSED));
    }

    #[test]
    fn test_invalid_proof_is_never_verified() {
        let res = result(json!({
            "status": "DONE", "proofStatus": "INVALID",
            "disclosed": [[{"id": ATTR, "rawvalue": "AB1234567"}]]
        }));
        assert_eq!(evaluate(&res, ATTR, &ticket()), Verdict::Incomplete);
        assert!(Verdict::Incomplete.message().is_none());
    }

    #[test]
    fn test_protocol_error_is_surfaced_even_with_matching_data() {
        let res = result(json!({
            "status": "DONE", "proofStatus": "VALID",
            "error": {"message": "session expired"},
            "disclosed": [[{"id": ATTR, "rawvalue": "AB1234567"}]]
        }));
        let verdict = evaluate(&res, ATTR, &ticket());
        assert_eq!(verdict, Verdict::Failed("session expired".into()));
        assert!(!verdict.is_verified());
    }

    #[test]
    fn test_unfinished_session_is_incomplete() {
        let res = result(json!({"status": "CONNECTED", "proofStatus": ""}));
        assert_eq!(evaluate(&res, ATTR, &ticket()), Verdict::Incomplete);
    }
}
