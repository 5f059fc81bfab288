//! Command-line front end over the board.
//!
//! Projects can be named by id prefix or by name; tickets and instructions
//! by id prefix, as printed by the render functions.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::board::Board;
use crate::models::*;
use crate::persistence::Persistence;
use crate::render;

#[derive(Debug, Parser)]
#[command(name = "kanban")]
#[command(about = "Single-user Kanban board for projects, tickets and checklists")]
pub struct Cli {
    /// SQLite database to use instead of the configured one
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Keep the board in memory only; nothing is written to disk
    #[arg(long, global = true, conflicts_with = "database")]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List projects with their ticket counts
    Projects,
    /// Create, rename or delete a project
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Show a project's kanban columns
    Board { project: String },
    /// Work with tickets
    #[command(subcommand)]
    Ticket(TicketCommand),
    /// Work with a ticket's checklist
    #[command(subcommand)]
    Step(StepCommand),
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    Add { name: String },
    Rename { project: String, name: String },
    /// Delete a project and all of its tickets
    Rm { project: String },
}

#[derive(Debug, Subcommand)]
pub enum TicketCommand {
    Add {
        project: String,
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, value_parser = parse_status, default_value = "backlog")]
        status: Status,
        #[arg(short, long, value_parser = parse_priority, default_value = "medium")]
        priority: Priority,
        /// Checklist line; repeat for several
        #[arg(long = "step")]
        steps: Vec<String>,
    },
    Show { ticket: String },
    /// Move a ticket to another column
    Move {
        ticket: String,
        #[arg(value_parser = parse_status)]
        status: Status,
    },
    Priority {
        ticket: String,
        #[arg(value_parser = parse_priority)]
        priority: Priority,
    },
    Edit {
        ticket: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    Rm { ticket: String },
}

#[derive(Debug, Subcommand)]
pub enum StepCommand {
    Add { ticket: String, text: String },
    Toggle { step: String },
    Rm { step: String },
}

/// Accepts storage keys and column labels alike: `todo`, `To Do`, `to-do`.
pub fn parse_status(s: &str) -> Result<Status, String> {
    Status::from_str(&normalize(s)).ok_or_else(|| {
        format!("unknown status '{s}', expected one of: backlog, todo, totest, done")
    })
}

pub fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::from_str(&normalize(s)).ok_or_else(|| {
        format!("unknown priority '{s}', expected one of: low, medium, high, critical")
    })
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Runs one command against the board, writing human output to `out`.
pub fn run<P: Persistence>(
    command: Option<Command>,
    board: &mut Board<P>,
    out: &mut impl Write,
) -> Result<()> {
    match command.unwrap_or(Command::Projects) {
        Command::Projects => {
            if board.projects().is_empty() {
                writeln!(out, "No projects yet. Create one with `kanban project add <name>`.")?;
            } else {
                write!(out, "{}", render::render_sidebar(board.projects()))?;
            }
        }
        Command::Project(ProjectCommand::Add { name }) => {
            let project = board.create_project(&name)?;
            writeln!(out, "Created project {} {}", render::short_id(project.id), project.name)?;
        }
        Command::Project(ProjectCommand::Rename { project, name }) => {
            let id = resolve_project(board, &project)?;
            board.rename_project(id, &name)?;
        }
        Command::Project(ProjectCommand::Rm { project }) => {
            let id = resolve_project(board, &project)?;
            board.delete_project(id);
        }
        Command::Board { project } => {
            let id = resolve_project(board, &project)?;
            if let Some(columns) = board.columns(id) {
                write!(out, "{}", render::render_columns(&columns))?;
            }
        }
        Command::Ticket(TicketCommand::Add {
            project,
            title,
            description,
            status,
            priority,
            steps,
        }) => {
            let id = resolve_project(board, &project)?;
            let input = CreateTicketInput {
                title,
                description,
                status,
                priority,
                instructions: steps,
            };
            if let Some(ticket) = board.create_ticket(id, input)? {
                writeln!(out, "Created ticket {} {}", render::short_id(ticket.id), ticket.title)?;
            }
        }
        Command::Ticket(TicketCommand::Show { ticket }) => {
            let id = resolve_ticket(board, &ticket)?;
            if let Some(ticket) = board.ticket(id) {
                write!(out, "{}", render::render_ticket(ticket))?;
            }
        }
        Command::Ticket(TicketCommand::Move { ticket, status }) => {
            let id = resolve_ticket(board, &ticket)?;
            board.set_ticket_status(id, status);
        }
        Command::Ticket(TicketCommand::Priority { ticket, priority }) => {
            let id = resolve_ticket(board, &ticket)?;
            board.set_ticket_priority(id, priority);
        }
        Command::Ticket(TicketCommand::Edit {
            ticket,
            title,
            description,
        }) => {
            let id = resolve_ticket(board, &ticket)?;
            board.update_ticket(
                id,
                UpdateTicketInput {
                    title,
                    description,
                    ..Default::default()
                },
            )?;
        }
        Command::Ticket(TicketCommand::Rm { ticket }) => {
            let id = resolve_ticket(board, &ticket)?;
            board.delete_ticket(id);
        }
        Command::Step(StepCommand::Add { ticket, text }) => {
            let id = resolve_ticket(board, &ticket)?;
            if let Some(instruction) = board.add_instruction(id, &text)? {
                writeln!(out, "Added step {}", render::short_id(instruction.id))?;
            }
        }
        Command::Step(StepCommand::Toggle { step }) => {
            let id = resolve_instruction(board, &step)?;
            if let Some(completed) = board.toggle_instruction(id) {
                let state = if completed { "done" } else { "open" };
                writeln!(out, "Step {} is {}", render::short_id(id), state)?;
            }
        }
        Command::Step(StepCommand::Rm { step }) => {
            let id = resolve_instruction(board, &step)?;
            if let Some(ticket_id) = board.ticket_of(id).map(|t| t.id) {
                board.remove_instruction(ticket_id, id);
            }
        }
    }
    Ok(())
}

fn resolve_project<P: Persistence>(board: &Board<P>, reference: &str) -> Result<Uuid> {
    if let Some(project) = board
        .projects()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(reference))
    {
        return Ok(project.id);
    }
    pick("project", reference, board.projects().iter().map(|p| p.id))
}

fn resolve_ticket<P: Persistence>(board: &Board<P>, reference: &str) -> Result<Uuid> {
    pick("ticket", reference, board.tickets().map(|t| t.id))
}

fn resolve_instruction<P: Persistence>(board: &Board<P>, reference: &str) -> Result<Uuid> {
    pick(
        "step",
        reference,
        board
            .tickets()
            .flat_map(|t| t.instructions.iter().map(|i| i.id)),
    )
}

/// Picks the single id whose hex form starts with `prefix`.
fn pick(entity: &str, prefix: &str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let prefix = prefix.to_ascii_lowercase().replace('-', "");
    if prefix.is_empty() {
        bail!("Empty {entity} reference");
    }
    let matches: Vec<Uuid> = ids
        .filter(|id| id.simple().to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("No {entity} matches '{prefix}'"),
        _ => bail!("'{prefix}' matches {} {entity}s, use a longer prefix", matches.len()),
    }
}
