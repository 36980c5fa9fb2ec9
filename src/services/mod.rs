// src/services/mod.rs
//! Business logic and API.

pub mod api_server;
pub mod attribute_matcher;
pub mod credential_issuer;
pub mod orchestrator;
pub mod verifier;
