//! Domain models for the Kanban board.
//!
//! # Core Concepts
//!
//! - [`Project`]: Top-level container shown in the sidebar. Owns its tickets.
//! - [`Ticket`]: A unit of work in one [`Status`] column with a [`Priority`]
//!   and a checklist. Owns its instructions.
//! - [`Instruction`]: A single checklist line that can be ticked off.
//!
//! Ownership runs one way only. Children never store their parent; the
//! board answers "which project is this ticket in" by looking it up.

mod instruction;
mod project;
mod ticket;

pub use instruction::*;
pub use project::*;
pub use ticket::*;
