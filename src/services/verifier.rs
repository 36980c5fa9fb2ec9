// src/services/verifier.rs
//! HTTP client for the external attribute verification/issuance server.
//!
//! Two calls are used:
//! - `POST {base}/session` with a signed requestor JWT starts a session
//! - `GET {base}/session/{token}/result` fetches the session result
//!
//! Each call runs under the fixed timeout configured on the client; nothing
//! is retried.

use crate::error::VerifierError;
use crate::models::session_request::SessionPackage;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;

/// Thin wrapper around a pooled `reqwest` client bound to one verifier.
#[derive(Clone)]
pub struct VerifierClient {
    http: reqwest::Client,
    base_url: String,
}

impl VerifierClient {
    /// Creates a client for the verifier at `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Verifier root URL; a trailing slash is ignored
    /// * `timeout` - Deadline applied to every request
    ///
    /// # Errors
    /// Returns `Err` if the TLS backend cannot be initialised.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, VerifierError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Starts a session from a signed requestor JWT.
    ///
    /// # Arguments
    /// * `signed_request` - RS256 requestor JWT, sent as `text/plain`
    ///
    /// # Returns
    /// - `Ok(SessionPackage)` with the session pointer and result token
    /// - `Err(VerifierError)` on transport failure, a non-2xx status or an
    ///   unparsable body
    pub async fn start_session(&self, signed_request: String) -> Result<SessionPackage, VerifierError> {
        let response = self
            .http
            .post(format!("{}/session", self.base_url))
            .header(CONTENT_TYPE, "text/plain")
            .header(ACCEPT, "application/json")
            .body(signed_request)
            .send()
            .await?;

        let body = Self::successful_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches the raw JSON result of the session owning `token`.
    ///
    /// # Returns
    /// The result exactly as the verifier sent it; interpretation is left to
    /// the caller
    pub async fn session_result(&self, token: &str) -> Result<serde_json::Value, VerifierError> {
        let response = self
            .http
            .get(format!("{}/session/{}/result", self.base_url, token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let body = Self::successful_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn successful_body(response: reqwest::Response) -> Result<String, VerifierError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VerifierError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_start_session_posts_jwt_as_text() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/session")
            .match_header("content-type", "text/plain")
            .match_body("header.claims.sig")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token": "tok-1", "sessionPtr": {"u": "http://irma/irma/session/abc", "irmaqr": "disclosing"}}"#)
            .create_async()
            .await;

        let client = VerifierClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let package = client.start_session("header.claims.sig".into()).await.unwrap();

        assert_eq!(package.token, "tok-1");
        assert_eq!(package.session_ptr["u"], "http://irma/irma/session/abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/session")
            .with_status(403)
            .with_body("requestor not authorized")
            .create_async()
            .await;

        let client = VerifierClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        match client.start_session("jwt".into()).await {
            Err(VerifierError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "requestor not authorized");
            }
            other => panic!("unexpected outcome: {:?}", other.map(|p| p.token)),
        }
    }

    #[tokio::test]
    async fn test_unparsable_result_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/session/tok-1/result")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = VerifierClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.session_result("tok-1").await,
            Err(VerifierError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_verifier_is_transport_error() {
        let client = VerifierClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            client.session_result("tok").await,
            Err(VerifierError::Transport(_))
        ));
    }
}
