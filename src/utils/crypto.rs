// src/utils/crypto.rs
//! JWT utilities for talking to the verifier.
//!
//! Session requests are signed as RS256 requestor JWTs; session results
//! delivered to the callback endpoint arrive as JWTs signed by the verifier.

use crate::error::SigningError;
use crate::models::session_request::{RequestorClaims, ServiceProviderRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// JWT subject of a verification (disclosure) requestor request.
pub const VERIFICATION_REQUEST_SUBJECT: &str = "verification_request";

/// Signs requestor requests with the service's RSA private key.
pub struct RequestSigner {
    key: EncodingKey,
    requestor_id: String,
}

impl RequestSigner {
    pub fn from_pem(pem: &[u8], requestor_id: impl Into<String>) -> Result<Self, SigningError> {
        Ok(RequestSigner {
            key: EncodingKey::from_rsa_pem(pem).map_err(SigningError::InvalidKey)?,
            requestor_id: requestor_id.into(),
        })
    }

    /// Reads the PEM key from disk on every call so a rotated key is picked up.
    pub async fn from_pem_file(path: &str, requestor_id: impl Into<String>) -> Result<Self, SigningError> {
        let pem = tokio::fs::read(path)
            .await
            .map_err(|source| SigningError::KeyUnreadable {
                path: path.to_string(),
                source,
            })?;
        Self::from_pem(&pem, requestor_id)
    }

    /// Produces the compact JWT for a service-provider request.
    pub fn sign(&self, request: &ServiceProviderRequest) -> Result<String, SigningError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.requestor_id.clone());

        let claims = RequestorClaims {
            iss: self.requestor_id.clone(),
            sub: VERIFICATION_REQUEST_SUBJECT.to_string(),
            iat: chrono::Utc::now().timestamp(),
            sprequest: request.clone(),
        };
        encode(&header, &claims, &self.key).map_err(SigningError::Sign)
    }
}

/// Decodes the claims of a result JWT.
///
/// With a public key the RS256 signature is enforced. Without one only the
/// structure is decoded and the caller must not rely on the issuer.
pub fn decode_result_jwt<T: DeserializeOwned>(
    jwt: &str,
    verifier_public_key: Option<&[u8]>,
) -> Result<T, SigningError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    let key = match verifier_public_key {
        Some(pem) => DecodingKey::from_rsa_pem(pem).map_err(SigningError::InvalidKey)?,
        None => {
            validation.insecure_disable_signature_validation();
            DecodingKey::from_secret(&[])
        }
    };

    decode::<T>(jwt.trim(), &key, &validation)
        .map(|data| data.claims)
        .map_err(SigningError::Decode)
}
