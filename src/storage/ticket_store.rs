// src/storage/ticket_store.rs
//! In-process ticket registry.
//!
//! Tickets are created once and never updated or deleted. Callers only ever
//! receive clones, so stored state cannot be mutated through a returned value.

use crate::error::StoreError;
use crate::models::ticket::{NewTicket, Ticket};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Thread-safe ticket registry keyed by ticket id.
///
/// This store provides:
/// - Concurrent reads, exclusive writes
/// - Unique 128-bit hex identifiers assigned on creation
/// - No eviction: tickets live until the process exits
#[derive(Default)]
pub struct TicketStore {
    tickets: RwLock<HashMap<String, Ticket>>,
}

impl TicketStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new ticket under a fresh random id.
    ///
    /// # Arguments
    /// * `ticket` - Validated, normalized passenger and flight data
    ///
    /// # Returns
    /// A copy of the stored ticket, including its id and creation time
    pub fn create(&self, ticket: NewTicket) -> Ticket {
        let mut tickets = self.tickets.write().unwrap_or_else(PoisonError::into_inner);

        // 128 random bits make a collision practically impossible; the loop
        // only guards the invariant that ids are never reused.
        let id = loop {
            let candidate = new_id();
            if !tickets.contains_key(&candidate) {
                break candidate;
            }
        };

        let stored = Ticket {
            id: id.clone(),
            first_name: ticket.first_name,
            last_name: ticket.last_name,
            document_number: ticket.document_number,
            flight: ticket.flight,
            created_at: Utc::now(),
        };
        tickets.insert(id, stored.clone());
        stored
    }

    /// Retrieves a ticket by its id.
    ///
    /// # Arguments
    /// * `id` - The ticket identifier to look up
    ///
    /// # Returns
    /// - `Ok(Ticket)` with a copy of the stored ticket
    /// - `Err(StoreError::TicketNotFound)` if no ticket has that id
    pub fn get(&self, id: &str) -> Result<Ticket, StoreError> {
        self.tickets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::TicketNotFound(id.to_string()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tickets.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn new_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
