// src/lib.rs

//! # Boarding Pass Service
//!
//! Lets a passenger prove, through an attribute-disclosure session run by an
//! external verifier, that their passport matches a previously issued ticket.
//! Only on an exact match is a boarding pass credential issued.
//!
//! ## Architecture Overview
//! 1. **Storage Layer**: tickets, verifier session tokens, session-to-ticket links
//! 2. **Services Layer**: attribute matching, the verification state machine,
//!    the verifier HTTP client and the axum API
//! 3. **Models**: tickets, disclosure results and protocol payloads
//! 4. **Utilities**: requestor JWT signing and URL helpers

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
