//! Single-user Kanban board.
//!
//! A [`Board`](board::Board) holds projects, their tickets and each ticket's
//! checklist, persisting every change through a
//! [`Persistence`](persistence::Persistence) backend and notifying
//! subscribers after each mutation.

pub mod board;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod persistence;
pub mod render;

pub use error::{Error, Result};
