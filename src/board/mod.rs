//! The board repository: the live project graph plus every operation on it.
//!
//! Each mutating operation changes the in-memory graph, stages the affected
//! records with the [`Persistence`] backend, saves, and then notifies
//! subscribers with a single [`BoardEvent`]. Save failures are logged and
//! swallowed; the graph stays authoritative and the backend retries the
//! staged batch on the next save.
//!
//! Operations on entities that are no longer on the board do nothing and
//! report that through their return value (`false` or `None`).

mod events;

pub use events::{BoardEvent, SubscriptionId};

use uuid::Uuid;

use crate::error::{require_text, Error, Result};
use crate::models::*;
use crate::persistence::{EntityKey, Load, Persistence, Record};

use events::Subscribers;

/// One kanban column: a status and the project's tickets in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Column<'a> {
    pub status: Status,
    pub tickets: Vec<&'a Ticket>,
}

pub struct Board<P> {
    projects: Vec<Project>,
    store: P,
    subscribers: Subscribers,
}

impl<P: Persistence + Load> Board<P> {
    /// Opens a board over whatever `store` already holds.
    pub fn load(store: P) -> anyhow::Result<Self> {
        let projects = store.load_projects()?;
        tracing::info!("Loaded {} project(s)", projects.len());
        Ok(Self {
            projects,
            store,
            subscribers: Subscribers::default(),
        })
    }
}

impl<P: Persistence> Board<P> {
    /// An empty board. Anything already in `store` is ignored.
    pub fn new(store: P) -> Self {
        Self {
            projects: Vec::new(),
            store,
            subscribers: Subscribers::default(),
        }
    }

    pub fn persistence(&self) -> &P {
        &self.store
    }

    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.store
    }

    // ============================================================
    // Subscriptions
    // ============================================================

    pub fn subscribe(&mut self, listener: impl FnMut(&BoardEvent) + 'static) -> SubscriptionId {
        self.subscribers.add(Box::new(listener))
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // ============================================================
    // Reads
    // ============================================================

    /// Projects in creation order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn ticket(&self, id: Uuid) -> Option<&Ticket> {
        self.projects.iter().find_map(|p| p.ticket(id))
    }

    pub fn instruction(&self, id: Uuid) -> Option<&Instruction> {
        self.tickets().find_map(|t| t.instruction(id))
    }

    /// The project whose collection holds the ticket.
    pub fn project_of(&self, ticket_id: Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| p.ticket(ticket_id).is_some())
    }

    /// The ticket whose checklist holds the instruction.
    pub fn ticket_of(&self, instruction_id: Uuid) -> Option<&Ticket> {
        self.tickets().find(|t| t.instruction(instruction_id).is_some())
    }

    /// Every ticket on the board, project by project.
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.projects.iter().flat_map(|p| p.tickets.iter())
    }

    /// The project's tickets split into the four status columns, left to right.
    pub fn columns(&self, project_id: Uuid) -> Option<Vec<Column<'_>>> {
        let project = self.project(project_id)?;
        Some(
            Status::ALL
                .iter()
                .map(|&status| Column {
                    status,
                    tickets: project.tickets.iter().filter(|t| t.status == status).collect(),
                })
                .collect(),
        )
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        let name = require_text("name", name)?;
        let project = Project::new(name);

        self.store.insert(Record::project(&project));
        self.projects.push(project.clone());
        tracing::info!(project_id = %project.id, "Created project '{}'", project.name);

        self.commit(BoardEvent::ProjectCreated {
            project_id: project.id,
        });
        Ok(project)
    }

    pub fn rename_project(&mut self, project_id: Uuid, name: &str) -> Result<bool> {
        let name = require_text("name", name)?;
        let Some(p) = found(self.locate_project(project_id)) else {
            return Ok(false);
        };

        let project = &mut self.projects[p];
        project.name = name;
        self.store.insert(Record::project(project));

        self.commit(BoardEvent::ProjectRenamed { project_id });
        Ok(true)
    }

    /// Deletes the project with all of its tickets and their instructions.
    pub fn delete_project(&mut self, project_id: Uuid) -> bool {
        let Some(p) = found(self.locate_project(project_id)) else {
            return false;
        };

        let project = self.projects.remove(p);
        for ticket in &project.tickets {
            self.stage_ticket_delete(ticket);
        }
        self.store.delete(EntityKey::Project(project.id));
        tracing::info!(
            project_id = %project.id,
            "Deleted project '{}' with {} ticket(s)",
            project.name,
            project.ticket_count()
        );

        self.commit(BoardEvent::ProjectDeleted { project_id });
        true
    }

    // ============================================================
    // Ticket operations
    // ============================================================

    /// Adds a ticket to the end of the project's collection.
    ///
    /// Returns `Ok(None)` if the project is not on the board.
    pub fn create_ticket(
        &mut self,
        project_id: Uuid,
        input: CreateTicketInput,
    ) -> Result<Option<Ticket>> {
        require_text("title", &input.title)?;
        let Some(p) = found(self.locate_project(project_id)) else {
            return Ok(None);
        };

        let ticket = Ticket::new(input);
        self.stage_ticket_insert(project_id, &ticket);
        self.projects[p].tickets.push(ticket.clone());
        tracing::info!(
            %project_id,
            ticket_id = %ticket.id,
            "Created ticket '{}' in {}",
            ticket.title,
            ticket.status.label()
        );

        self.commit(BoardEvent::TicketCreated {
            project_id,
            ticket_id: ticket.id,
        });
        Ok(Some(ticket))
    }

    /// Edits any subset of the ticket's fields in place.
    ///
    /// Nothing is saved or emitted when the input leaves the ticket as it was.
    pub fn update_ticket(
        &mut self,
        ticket_id: Uuid,
        input: UpdateTicketInput,
    ) -> Result<Option<Ticket>> {
        let title = input
            .title
            .as_deref()
            .map(|title| require_text("title", title))
            .transpose()?;
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return Ok(None);
        };

        let project_id = self.projects[p].id;
        let ticket = &mut self.projects[p].tickets[t];
        let before = ticket.clone();
        if let Some(title) = title {
            ticket.title = title;
        }
        if let Some(description) = input.description {
            ticket.description = description;
        }
        if let Some(status) = input.status {
            ticket.status = status;
        }
        if let Some(priority) = input.priority {
            ticket.priority = priority;
        }
        if *ticket == before {
            return Ok(Some(before));
        }

        let updated = ticket.clone();
        self.store.insert(Record::ticket(project_id, &updated));
        self.commit(BoardEvent::TicketUpdated {
            project_id,
            ticket_id,
        });
        Ok(Some(updated))
    }

    /// Moves the ticket to another column.
    ///
    /// Returns `true` if the status changed. Setting the current status is a
    /// no-op that neither saves nor emits.
    pub fn set_ticket_status(&mut self, ticket_id: Uuid, status: Status) -> bool {
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return false;
        };

        // TODO: confirm with product whether moves should be limited to
        // adjacent columns; today any column can follow any other.
        let project_id = self.projects[p].id;
        let ticket = &mut self.projects[p].tickets[t];
        if ticket.status == status {
            return false;
        }
        tracing::debug!(
            %ticket_id,
            "Moving ticket from {} to {}",
            ticket.status.label(),
            status.label()
        );
        ticket.status = status;
        self.store.insert(Record::ticket(project_id, ticket));

        self.commit(BoardEvent::TicketUpdated {
            project_id,
            ticket_id,
        });
        true
    }

    /// Overwrites the priority. Returns `false` only if the ticket is gone.
    pub fn set_ticket_priority(&mut self, ticket_id: Uuid, priority: Priority) -> bool {
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return false;
        };

        let project_id = self.projects[p].id;
        let ticket = &mut self.projects[p].tickets[t];
        ticket.priority = priority;
        self.store.insert(Record::ticket(project_id, ticket));

        self.commit(BoardEvent::TicketUpdated {
            project_id,
            ticket_id,
        });
        true
    }

    /// Removes the ticket from its project, deleting its instructions with it.
    pub fn delete_ticket(&mut self, ticket_id: Uuid) -> bool {
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return false;
        };

        let project_id = self.projects[p].id;
        let ticket = self.projects[p].tickets.remove(t);
        self.stage_ticket_delete(&ticket);
        tracing::info!(%project_id, %ticket_id, "Deleted ticket '{}'", ticket.title);

        self.commit(BoardEvent::TicketDeleted {
            project_id,
            ticket_id,
        });
        true
    }

    // ============================================================
    // Instruction operations
    // ============================================================

    /// Appends an incomplete instruction to the ticket's checklist.
    ///
    /// Returns `Ok(None)` if the ticket is not on the board.
    pub fn add_instruction(&mut self, ticket_id: Uuid, text: &str) -> Result<Option<Instruction>> {
        let text = require_text("instruction", text)?;
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return Ok(None);
        };

        let instruction = Instruction::new(text);
        self.store.insert(Record::instruction(ticket_id, &instruction));
        self.projects[p].tickets[t].instructions.push(instruction.clone());

        self.commit(BoardEvent::InstructionAdded {
            ticket_id,
            instruction_id: instruction.id,
        });
        Ok(Some(instruction))
    }

    /// Flips the instruction's completed flag and returns the new value.
    pub fn toggle_instruction(&mut self, instruction_id: Uuid) -> Option<bool> {
        let (p, t, i) = found(self.locate_instruction(instruction_id))?;

        let ticket = &mut self.projects[p].tickets[t];
        let ticket_id = ticket.id;
        let instruction = &mut ticket.instructions[i];
        instruction.completed = !instruction.completed;
        let completed = instruction.completed;
        self.store.insert(Record::instruction(ticket_id, instruction));

        self.commit(BoardEvent::InstructionUpdated {
            ticket_id,
            instruction_id,
        });
        Some(completed)
    }

    pub fn set_instruction_text(&mut self, instruction_id: Uuid, text: &str) -> Result<bool> {
        let text = require_text("instruction", text)?;
        let Some((p, t, i)) = found(self.locate_instruction(instruction_id)) else {
            return Ok(false);
        };

        let ticket = &mut self.projects[p].tickets[t];
        let ticket_id = ticket.id;
        let instruction = &mut ticket.instructions[i];
        if instruction.text == text {
            return Ok(true);
        }
        instruction.text = text;
        self.store.insert(Record::instruction(ticket_id, instruction));

        self.commit(BoardEvent::InstructionUpdated {
            ticket_id,
            instruction_id,
        });
        Ok(true)
    }

    /// Removes the instruction from the ticket's checklist.
    ///
    /// Does nothing unless the instruction is on that ticket.
    pub fn remove_instruction(&mut self, ticket_id: Uuid, instruction_id: Uuid) -> bool {
        let Some((p, t)) = found(self.locate_ticket(ticket_id)) else {
            return false;
        };
        let ticket = &mut self.projects[p].tickets[t];
        let Some(i) = ticket.instruction_position(instruction_id) else {
            tracing::debug!(%ticket_id, %instruction_id, "Instruction not on ticket, ignoring");
            return false;
        };

        ticket.instructions.remove(i);
        self.store.delete(EntityKey::Instruction(instruction_id));

        self.commit(BoardEvent::InstructionRemoved {
            ticket_id,
            instruction_id,
        });
        true
    }

    // ============================================================
    // Internals
    // ============================================================

    fn commit(&mut self, event: BoardEvent) {
        if let Err(e) = self.store.save() {
            tracing::error!("Failed to save board changes: {:#}", e);
        }
        self.subscribers.emit(&event);
    }

    fn stage_ticket_insert(&mut self, project_id: Uuid, ticket: &Ticket) {
        self.store.insert(Record::ticket(project_id, ticket));
        for instruction in &ticket.instructions {
            self.store.insert(Record::instruction(ticket.id, instruction));
        }
    }

    /// Children first, so the batch never leaves an instruction without
    /// its ticket.
    fn stage_ticket_delete(&mut self, ticket: &Ticket) {
        for instruction in &ticket.instructions {
            self.store.delete(EntityKey::Instruction(instruction.id));
        }
        self.store.delete(EntityKey::Ticket(ticket.id));
    }

    fn locate_project(&self, id: Uuid) -> Result<usize> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or(Error::NotFound {
                entity: "project",
                id,
            })
    }

    fn locate_ticket(&self, id: Uuid) -> Result<(usize, usize)> {
        self.projects
            .iter()
            .enumerate()
            .find_map(|(p, project)| project.ticket_position(id).map(|t| (p, t)))
            .ok_or(Error::NotFound {
                entity: "ticket",
                id,
            })
    }

    fn locate_instruction(&self, id: Uuid) -> Result<(usize, usize, usize)> {
        self.projects
            .iter()
            .enumerate()
            .find_map(|(p, project)| {
                project
                    .tickets
                    .iter()
                    .enumerate()
                    .find_map(|(t, ticket)| ticket.instruction_position(id).map(|i| (p, t, i)))
            })
            .ok_or(Error::NotFound {
                entity: "instruction",
                id,
            })
    }
}

/// Turns a missing entity into `None`, logging it.
fn found<T>(lookup: Result<T>) -> Option<T> {
    match lookup {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("{}, ignoring", e);
            None
        }
    }
}
