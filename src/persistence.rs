//! The storage seam between the board and whatever keeps it on disk.
//!
//! The board describes every mutation as flat [`Record`]s and
//! [`EntityKey`]s, hands them to a [`Persistence`] backend and then asks it
//! to [`save`](Persistence::save). Backends buffer changes until `save`, so
//! everything recorded for one operation (a cascading delete, say) lands
//! together or not at all.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstructionRecord {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub text: String,
    pub completed: bool,
}

/// One entity in its stored form, parent id included.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Project(ProjectRecord),
    Ticket(TicketRecord),
    Instruction(InstructionRecord),
}

impl Record {
    pub fn project(project: &Project) -> Self {
        Self::Project(ProjectRecord {
            id: project.id,
            name: project.name.clone(),
            created_at: project.created_at,
        })
    }

    pub fn ticket(project_id: Uuid, ticket: &Ticket) -> Self {
        Self::Ticket(TicketRecord {
            id: ticket.id,
            project_id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            status: ticket.status,
            priority: ticket.priority,
            created_at: ticket.created_at,
        })
    }

    pub fn instruction(ticket_id: Uuid, instruction: &Instruction) -> Self {
        Self::Instruction(InstructionRecord {
            id: instruction.id,
            ticket_id,
            text: instruction.text.clone(),
            completed: instruction.completed,
        })
    }

    pub fn key(&self) -> EntityKey {
        match self {
            Self::Project(p) => EntityKey::Project(p.id),
            Self::Ticket(t) => EntityKey::Ticket(t.id),
            Self::Instruction(i) => EntityKey::Instruction(i.id),
        }
    }
}

/// Identifies a stored entity for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Project(Uuid),
    Ticket(Uuid),
    Instruction(Uuid),
}

/// A buffered change awaiting `save`.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Insert(Record),
    Delete(EntityKey),
}

/// A durable home for the board's object graph.
pub trait Persistence {
    /// Stages `record`, replacing any stored entity with the same id.
    fn insert(&mut self, record: Record);

    /// Stages removal of the entity. Unknown keys are ignored on save.
    fn delete(&mut self, key: EntityKey);

    /// Applies every staged change as one unit.
    ///
    /// On failure nothing is applied. The staged changes are kept for the
    /// next call unless the backend finds they can never apply.
    fn save(&mut self) -> Result<()>;
}

/// Backends that can rebuild the object graph they stored.
pub trait Load {
    fn load_projects(&self) -> Result<Vec<Project>>;
}

/// In-process backend that keeps committed records in memory.
///
/// Used for tests and `--ephemeral` runs. It can be told to fail saves to
/// exercise the board's error path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pending: Vec<Change>,
    committed: HashMap<EntityKey, Record>,
    /// Insertion sequence per key, so loads keep collection order.
    order: HashMap<EntityKey, u64>,
    next_seq: u64,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    pub fn get(&self, key: EntityKey) -> Option<&Record> {
        self.committed.get(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.committed.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    fn sorted<T: Clone>(&self, pick: impl Fn(&Record) -> Option<&T>) -> Vec<T> {
        let mut rows: Vec<(u64, T)> = self
            .committed
            .iter()
            .filter_map(|(key, record)| {
                let seq = self.order.get(key).copied().unwrap_or(0);
                pick(record).map(|row| (seq, row.clone()))
            })
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

impl Persistence for MemoryStore {
    fn insert(&mut self, record: Record) {
        self.pending.push(Change::Insert(record));
    }

    fn delete(&mut self, key: EntityKey) {
        self.pending.push(Change::Delete(key));
    }

    fn save(&mut self) -> Result<()> {
        if self.fail_saves {
            anyhow::bail!("memory store configured to fail saves");
        }
        for change in std::mem::take(&mut self.pending) {
            match change {
                Change::Insert(record) => {
                    let key = record.key();
                    if !self.order.contains_key(&key) {
                        self.order.insert(key, self.next_seq);
                        self.next_seq += 1;
                    }
                    self.committed.insert(key, record);
                }
                Change::Delete(key) => {
                    self.committed.remove(&key);
                    self.order.remove(&key);
                }
            }
        }
        self.saves += 1;
        Ok(())
    }
}

impl Load for MemoryStore {
    fn load_projects(&self) -> Result<Vec<Project>> {
        let projects: Vec<ProjectRecord> = self.sorted(|r| match r {
            Record::Project(p) => Some(p),
            _ => None,
        });
        let tickets: Vec<TicketRecord> = self.sorted(|r| match r {
            Record::Ticket(t) => Some(t),
            _ => None,
        });
        let instructions: Vec<InstructionRecord> = self.sorted(|r| match r {
            Record::Instruction(i) => Some(i),
            _ => None,
        });
        Ok(assemble(projects, tickets, instructions))
    }
}

/// Builds the owned graph from flat rows, each list in collection order.
///
/// Rows whose parent is missing are dropped.
pub(crate) fn assemble(
    projects: Vec<ProjectRecord>,
    tickets: Vec<TicketRecord>,
    instructions: Vec<InstructionRecord>,
) -> Vec<Project> {
    let mut instructions_by_ticket: HashMap<Uuid, Vec<Instruction>> = HashMap::new();
    for row in instructions {
        instructions_by_ticket
            .entry(row.ticket_id)
            .or_default()
            .push(Instruction {
                id: row.id,
                text: row.text,
                completed: row.completed,
            });
    }

    let mut tickets_by_project: HashMap<Uuid, Vec<Ticket>> = HashMap::new();
    for row in tickets {
        tickets_by_project
            .entry(row.project_id)
            .or_default()
            .push(Ticket {
                id: row.id,
                title: row.title,
                description: row.description,
                status: row.status,
                priority: row.priority,
                created_at: row.created_at,
                instructions: instructions_by_ticket.remove(&row.id).unwrap_or_default(),
            });
    }

    projects
        .into_iter()
        .map(|row| Project {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            tickets: tickets_by_project.remove(&row.id).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_applies_staged_changes() {
        let mut store = MemoryStore::new();
        let project = Project::new("Site");
        store.insert(Record::project(&project));
        assert!(store.is_empty());
        assert_eq!(store.pending_len(), 1);

        store.save().unwrap();
        assert!(store.contains(EntityKey::Project(project.id)));
        assert_eq!(store.pending_len(), 0);

        store.delete(EntityKey::Project(project.id));
        store.save().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn failed_save_keeps_pending_changes() {
        let mut store = MemoryStore::new();
        store.set_fail_saves(true);
        store.insert(Record::project(&Project::new("Site")));

        assert!(store.save().is_err());
        assert!(store.is_empty());
        assert_eq!(store.pending_len(), 1);

        store.set_fail_saves(false);
        store.save().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_rebuilds_graph_in_order() {
        let mut store = MemoryStore::new();
        let project = Project::new("Site");
        let first = Ticket::new(CreateTicketInput {
            instructions: vec!["Repro".to_string(), "Fix".to_string()],
            ..CreateTicketInput::titled("Bug")
        });
        let second = Ticket::new(CreateTicketInput::titled("Docs"));

        store.insert(Record::project(&project));
        for ticket in [&first, &second] {
            store.insert(Record::ticket(project.id, ticket));
            for instruction in &ticket.instructions {
                store.insert(Record::instruction(ticket.id, instruction));
            }
        }
        store.save().unwrap();

        let loaded = store.load_projects().unwrap();
        assert_eq!(loaded.len(), 1);
        let titles: Vec<_> = loaded[0].tickets.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Bug", "Docs"]);
        assert_eq!(loaded[0].tickets[0].instructions, first.instructions);
    }

    #[test]
    fn assemble_drops_orphans() {
        let orphan = TicketRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Lost".to_string(),
            description: String::new(),
            status: Status::Backlog,
            priority: Priority::Medium,
            created_at: Utc::now(),
        };
        assert!(assemble(vec![], vec![orphan], vec![]).is_empty());
    }
}
