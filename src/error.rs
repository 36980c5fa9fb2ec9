// src/error.rs
//! Error taxonomy for the boarding pass service.
//!
//! Each layer owns one enum. Only [`ApiError`] knows about HTTP: it maps the
//! lower-level failures onto a status code and a short, stable response body,
//! while the full detail goes to the operator log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned for every failure whose detail must stay server-side.
pub const ERROR_INTERNAL: &str = "error:internal";

/// Failures raised by the ticket, token and session stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    #[error("no token stored for session {0}")]
    TokenNotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(#[from] redis::RedisError),
}

/// Failures while talking to the external verifier service.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("verifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verifier responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparsable verifier response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for VerifierError {
    fn from(e: serde_json::Error) -> Self {
        VerifierError::Malformed(e.to_string())
    }
}

/// Failures around key material and JWT handling.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to read key file {path}: {source}")]
    KeyUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key material: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign requestor request: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("failed to decode result JWT: {0}")]
    Decode(#[source] jsonwebtoken::errors::Error),
}

/// Failures of the verification/issuance orchestration.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("provided passenger data does not match ticket {0}")]
    TicketMismatch(String),

    #[error("unknown or expired session {0}")]
    InvalidSession(String),

    #[error("linked ticket disappeared: {0}")]
    LinkedTicketMissing(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// HTTP-facing error: a status, a stable short body and the internal detail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{detail}")]
    BadRequest { body: &'static str, detail: String },

    #[error("{detail}")]
    NotFound { body: &'static str, detail: String },

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(body: &'static str, detail: impl Into<String>) -> Self {
        ApiError::BadRequest { body, detail: detail.into() }
    }

    pub fn not_found(body: &'static str, detail: impl Into<String>) -> Self {
        ApiError::NotFound { body, detail: detail.into() }
    }

    fn status_and_body(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest { body, .. } => (StatusCode::BAD_REQUEST, body),
            ApiError::NotFound { body, .. } => (StatusCode::NOT_FOUND, body),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, ERROR_INTERNAL),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ERROR_INTERNAL),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        log::error!("{} -> returning status {} with body {:?}", self, status.as_u16(), body);
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TicketNotFound(_) => ApiError::not_found("ticket not found", e.to_string()),
            StoreError::TokenNotFound(_) => ApiError::bad_request("invalid sessionID", e.to_string()),
            StoreError::Backend(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::TicketMismatch(_) => ApiError::bad_request("ticket mismatch", e.to_string()),
            SessionError::InvalidSession(_) => ApiError::bad_request("invalid sessionID", e.to_string()),
            SessionError::LinkedTicketMissing(_) => ApiError::Internal(e.to_string()),
            SessionError::Store(inner) => inner.into(),
            SessionError::Verifier(inner) => ApiError::BadGateway(inner.to_string()),
            SessionError::Signing(SigningError::Decode(inner)) => {
                ApiError::bad_request("invalid JWT", inner.to_string())
            }
            SessionError::Signing(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_stable_bodies() {
        let err: ApiError = StoreError::TicketNotFound("abc".into()).into();
        assert_eq!(err.status_and_body(), (StatusCode::NOT_FOUND, "ticket not found"));

        let err: ApiError = StoreError::TokenNotFound("s1".into()).into();
        assert_eq!(err.status_and_body(), (StatusCode::BAD_REQUEST, "invalid sessionID"));
    }

    #[test]
    fn test_upstream_detail_is_not_exposed() {
        let err: ApiError = SessionError::Verifier(VerifierError::Status {
            status: 500,
            body: "stack trace with secrets".into(),
        })
        .into();
        assert_eq!(err.status_and_body(), (StatusCode::BAD_GATEWAY, ERROR_INTERNAL));
        assert!(err.to_string().contains("stack trace"));
    }

    #[test]
    fn test_mismatch_is_bad_request() {
        let err: ApiError = SessionError::TicketMismatch("t1".into()).into();
        assert_eq!(err.status_and_body(), (StatusCode::BAD_REQUEST, "ticket mismatch"));
    }
}
