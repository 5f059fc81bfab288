use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ticket::Ticket;

/// A named board of tickets.
///
/// Projects are the top-level organizational unit shown in the sidebar. A
/// project owns its tickets: the `tickets` collection is the only link
/// between the two, so a ticket's project is found by looking it up rather
/// than by following a stored reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Tickets in creation order.
    pub tickets: Vec<Ticket>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            tickets: Vec::new(),
        }
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    pub fn ticket(&self, id: Uuid) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub(crate) fn ticket_position(&self, id: Uuid) -> Option<usize> {
        self.tickets.iter().position(|t| t.id == id)
    }
}
