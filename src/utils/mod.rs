// src/utils/mod.rs
//! Helper functions: JWT handling and URL construction.

pub mod crypto;
pub mod url_helpers;
