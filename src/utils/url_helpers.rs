// src/utils/url_helpers.rs
//! URL helpers for session pointers and the verifier callback.

use axum::http::HeaderMap;
use reqwest::Url;

/// Path the verifier posts chained-session results to.
pub const CALLBACK_PATH: &str = "/api/irma/callback";

/// Extracts the session id: the last path segment of the pointer's `u` URL.
pub fn session_id_from_pointer(session_ptr: &serde_json::Value) -> Option<String> {
    let url = session_ptr.get("u")?.as_str()?;
    let id = url.rsplit('/').next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Resolves the public base URL of this service.
///
/// A configured base wins; otherwise it is reconstructed from proxy headers
/// (`X-Forwarded-Proto`, `X-Forwarded-Host`) falling back to `Host`.
pub fn public_base_url(configured: Option<&str>, headers: &HeaderMap) -> Option<Url> {
    if let Some(base) = configured.filter(|b| !b.trim().is_empty()) {
        return Url::parse(base.trim()).ok();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let scheme = header("x-forwarded-proto").unwrap_or("http");
    let host = header("x-forwarded-host").or_else(|| header("host"))?;
    Url::parse(&format!("{}://{}", scheme, host)).ok()
}

/// Builds the callback URL carrying the ticket id as query parameter.
pub fn callback_url(base: &Url, ticket_id: &str) -> Url {
    let mut url = base.clone();
    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, CALLBACK_PATH));
    url.set_query(None);
    url.query_pairs_mut().append_pair("ticketId", ticket_id);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_session_id_is_last_segment() {
        let ptr = json!({"u": "https://irma.example/irma/session/AbCdEf123", "irmaqr": "disclosing"});
        assert_eq!(session_id_from_pointer(&ptr).as_deref(), Some("AbCdEf123"));
    }

    #[test]
    fn test_session_id_rejects_bad_pointers() {
        assert!(session_id_from_pointer(&json!({"u": "https://irma.example/session/"})).is_none());
        assert!(session_id_from_pointer(&json!({"u": ""})).is_none());
        assert!(session_id_from_pointer(&json!({"irmaqr": "disclosing"})).is_none());
        assert!(session_id_from_pointer(&json!("just a string")).is_none());
    }

    #[test]
    fn test_public_base_prefers_configuration() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8080"));
        let base = public_base_url(Some("https://airline.example"), &headers).unwrap();
        assert_eq!(base.as_str(), "https://airline.example/");
    }

    #[test]
    fn test_public_base_from_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:8080"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("airline.example"));
        let base = public_base_url(None, &headers).unwrap();
        assert_eq!(base.as_str(), "https://airline.example/");

        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:8080"));
        let base = public_base_url(None, &headers).unwrap();
        assert_eq!(base.as_str(), "http://localhost:8080/");

        assert!(public_base_url(None, &HeaderMap::new()).is_none());
    }

    #[test]
    fn test_callback_url_encodes_ticket_id() {
        let base = Url::parse("https://airline.example/boarding/").unwrap();
        let url = callback_url(&base, "a b&c");
        assert_eq!(
            url.as_str(),
            "https://airline.example/boarding/api/irma/callback?ticketId=a+b%26c"
        );
    }
}
