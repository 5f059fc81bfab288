use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single checklist line on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instruction {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            completed: false,
        }
    }
}
