use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instruction::Instruction;

/// A unit of work on a project's board.
///
/// Tickets sit in exactly one [`Status`] column and carry an ordered
/// checklist of [`Instruction`]s. The checklist is owned by the ticket; an
/// instruction's ticket is found by looking it up on the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    /// Free text, may be empty.
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// Checklist in insertion order.
    pub instructions: Vec<Instruction>,
}

impl Ticket {
    pub fn new(input: CreateTicketInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            status: input.status,
            priority: input.priority,
            created_at: Utc::now(),
            instructions: input.instructions.into_iter().map(Instruction::new).collect(),
        }
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn completed_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.completed).count()
    }

    /// Fraction of the checklist that is done, `0.0` for an empty checklist.
    pub fn completion_ratio(&self) -> f64 {
        let total = self.instruction_count();
        if total == 0 {
            return 0.0;
        }
        self.completed_count() as f64 / total as f64
    }

    pub fn instruction(&self, id: Uuid) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.id == id)
    }

    pub(crate) fn instruction_position(&self, id: Uuid) -> Option<usize> {
        self.instructions.iter().position(|i| i.id == id)
    }
}

/// The kanban column a ticket sits in.
///
/// Columns are laid out left to right by [`Status::rank`]. Any status may
/// follow any other; a ticket can go straight from `Backlog` to `Done`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Backlog,
    #[serde(rename = "todo")]
    ToDo,
    #[serde(rename = "totest")]
    ToTest,
    Done,
}

impl Status {
    /// Every status in column order.
    pub const ALL: [Status; 4] = [Self::Backlog, Self::ToDo, Self::ToTest, Self::Done];

    pub fn rank(&self) -> u8 {
        match self {
            Self::Backlog => 0,
            Self::ToDo => 1,
            Self::ToTest => 2,
            Self::Done => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::ToDo => "To Do",
            Self::ToTest => "To Test",
            Self::Done => "Done",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::ToDo => "todo",
            Self::ToTest => "totest",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(Self::Backlog),
            "todo" => Some(Self::ToDo),
            "totest" => Some(Self::ToTest),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Urgency of a ticket.
///
/// Priority has no effect on board behavior; the colour is only a hint for
/// whatever renders the ticket.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Display colour name.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "gray",
            Self::Medium => "blue",
            Self::High => "orange",
            Self::Critical => "red",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Input for creating a new ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Initial column. Defaults to `Backlog`.
    #[serde(default)]
    pub status: Status,
    /// Defaults to `Medium`.
    #[serde(default)]
    pub priority: Priority,
    /// Checklist texts; each becomes an incomplete instruction.
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl CreateTicketInput {
    /// Input with only a title, everything else at its default.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: Status::default(),
            priority: Priority::default(),
            instructions: Vec::new(),
        }
    }
}

/// Input for editing a ticket in place. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTicketInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
}
