// src/storage/mod.rs
//! Shared state: tickets, verifier session tokens and session-to-ticket links.
//! Each store owns one mapping behind its own lock.

pub mod session_tracker;
pub mod ticket_store;
pub mod token_storage;
