// src/storage/session_tracker.rs
//! One-shot links from a verifier session to the ticket it verifies.
//!
//! A link is written when a session starts and removed the first time its
//! result is processed, so a session cannot be replayed to re-run matching.
//! Unlike token removal, removing an absent link is not an error.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Session-to-ticket links behind a single mutex.
#[derive(Default)]
pub struct SessionTracker {
    links: Mutex<HashMap<String, String>>,
}

impl SessionTracker {
    /// Creates a tracker with no links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a session to the ticket it was opened for.
    ///
    /// # Arguments
    /// * `session_id` - Verifier session identifier
    /// * `ticket_id` - Ticket the session verifies
    ///
    /// # Behavior
    /// Replaces any previous binding for the same session
    pub fn link(&self, session_id: &str, ticket_id: &str) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), ticket_id.to_string());
    }

    /// Looks up the ticket bound to a session without consuming the link.
    ///
    /// # Returns
    /// - `Some(ticket_id)` if the session is linked
    /// - `None` if it was never linked or has been consumed
    pub fn ticket_id(&self, session_id: &str) -> Option<String> {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// Drops the binding for a session.
    ///
    /// # Behavior
    /// Removing an absent link is a no-op, not an error
    pub fn remove(&self, session_id: &str) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    /// Removes and returns the binding under one lock acquisition.
    ///
    /// # Returns
    /// The linked ticket id for exactly one caller; `None` for every other
    pub fn take(&self, session_id: &str) -> Option<String> {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
    }
}
