//! Plain-text rendering of the sidebar, the kanban columns and a ticket's detail.

use uuid::Uuid;

use crate::board::Column;
use crate::models::{Priority, Project, Ticket};

const LOW: char = '·';
const MEDIUM: char = '○';
const HIGH: char = '●';
const CRITICAL: char = '‼';

fn priority_symbol(priority: Priority) -> char {
    match priority {
        Priority::Low => LOW,
        Priority::Medium => MEDIUM,
        Priority::High => HIGH,
        Priority::Critical => CRITICAL,
    }
}

/// First eight hex digits of an id, enough to pick an entity on one board.
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Render the project list with ticket counts.
///
/// ```text
/// 1a2b3c4d  Site (2)
/// 5e6f7a8b  Docs (0)
/// ```
pub fn render_sidebar(projects: &[Project]) -> String {
    let mut output = String::new();
    for project in projects {
        output.push_str(&format!(
            "{}  {} ({})\n",
            short_id(project.id),
            project.name,
            project.ticket_count()
        ));
    }
    output
}

/// Render each column as a heading followed by its ticket cards.
///
/// ```text
/// Backlog (1)
///   ● 1a2b3c4d Bug [1/2]
/// To Do (0)
/// ```
pub fn render_columns(columns: &[Column<'_>]) -> String {
    let mut output = String::new();
    for column in columns {
        output.push_str(&format!(
            "{} ({})\n",
            column.status.label(),
            column.tickets.len()
        ));
        for ticket in &column.tickets {
            output.push_str("  ");
            output.push_str(&render_card(ticket));
            output.push('\n');
        }
    }
    output
}

fn render_card(ticket: &Ticket) -> String {
    let mut card = format!(
        "{} {} {}",
        priority_symbol(ticket.priority),
        short_id(ticket.id),
        ticket.title
    );
    if ticket.instruction_count() > 0 {
        card.push_str(&format!(
            " [{}/{}]",
            ticket.completed_count(),
            ticket.instruction_count()
        ));
    }
    card
}

/// Render the detail sheet for one ticket.
pub fn render_ticket(ticket: &Ticket) -> String {
    let mut output = format!(
        "{}\nStatus: {}  Priority: {} ({})\n",
        ticket.title,
        ticket.status.label(),
        ticket.priority.label(),
        ticket.priority.color()
    );
    if !ticket.description.is_empty() {
        output.push('\n');
        output.push_str(&ticket.description);
        output.push('\n');
    }
    if !ticket.instructions.is_empty() {
        output.push_str(&format!(
            "\nChecklist {:.0}%\n",
            ticket.completion_ratio() * 100.0
        ));
        for instruction in &ticket.instructions {
            let mark = if instruction.completed { 'x' } else { ' ' };
            output.push_str(&format!(
                "  [{}] {} {}\n",
                mark,
                short_id(instruction.id),
                instruction.text
            ));
        }
    }
    output
}
