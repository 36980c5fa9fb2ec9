// src/models/mod.rs
//! Data structures shared across the service.

pub mod credential;
pub mod disclosure;
pub mod session_request;
pub mod ticket;
