//! SQLite persistence backend.

mod schema;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use crate::models::*;
use crate::persistence::*;

/// Board storage in a single SQLite file.
///
/// Changes are staged in memory and written in one transaction per
/// [`save`](Persistence::save). Rows keep their SQLite rowid across updates,
/// so loading by rowid reproduces collection order.
pub struct Database {
    conn: Connection,
    pending: Vec<Change>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            pending: Vec::new(),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        schema::run_migrations(&self.conn)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Total rows per table as `(projects, tickets, instructions)`.
    pub fn row_counts(&self) -> Result<(usize, usize, usize)> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok((count("projects")?, count("tickets")?, count("instructions")?))
    }

    fn apply(tx: &Transaction<'_>, change: &Change) -> Result<()> {
        match change {
            Change::Insert(Record::Project(p)) => {
                tx.execute(
                    "INSERT INTO projects (id, name, created_at) VALUES (?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                    (p.id.to_string(), &p.name, p.created_at.to_rfc3339()),
                )?;
            }
            Change::Insert(Record::Ticket(t)) => {
                tx.execute(
                    "INSERT INTO tickets (id, project_id, title, description, status, priority, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        title = excluded.title,
                        description = excluded.description,
                        status = excluded.status,
                        priority = excluded.priority",
                    (
                        t.id.to_string(),
                        t.project_id.to_string(),
                        &t.title,
                        &t.description,
                        t.status.as_str(),
                        t.priority.as_str(),
                        t.created_at.to_rfc3339(),
                    ),
                )?;
            }
            Change::Insert(Record::Instruction(i)) => {
                tx.execute(
                    "INSERT INTO instructions (id, ticket_id, text, completed) VALUES (?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET text = excluded.text, completed = excluded.completed",
                    (
                        i.id.to_string(),
                        i.ticket_id.to_string(),
                        &i.text,
                        i.completed,
                    ),
                )?;
            }
            Change::Delete(key) => {
                let (table, id) = match key {
                    EntityKey::Project(id) => ("projects", id),
                    EntityKey::Ticket(id) => ("tickets", id),
                    EntityKey::Instruction(id) => ("instructions", id),
                };
                tx.execute(
                    &format!("DELETE FROM {table} WHERE id = ?"),
                    [id.to_string()],
                )?;
            }
        }
        Ok(())
    }
}

impl Persistence for Database {
    fn insert(&mut self, record: Record) {
        self.pending.push(Change::Insert(record));
    }

    fn delete(&mut self, key: EntityKey) {
        self.pending.push(Change::Delete(key));
    }

    fn save(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let failure = self.pending.iter().find_map(|change| {
            Self::apply(&tx, change).err().map(|e| (e, format!("{:?}", change)))
        });
        if let Some((e, change)) = failure {
            drop(tx);
            // A constraint failure repeats on every retry, so the batch is dropped.
            if is_constraint_violation(&e) {
                tracing::error!(
                    "Discarding {} staged change(s), {} violates a constraint: {:#}",
                    self.pending.len(),
                    change,
                    e
                );
                self.pending.clear();
            }
            return Err(e.context(format!("Failed to apply {change}")));
        }
        tx.commit().context("Failed to commit board changes")?;

        tracing::debug!("Saved {} change(s)", self.pending.len());
        self.pending.clear();
        Ok(())
    }
}

impl Load for Database {
    fn load_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM projects ORDER BY rowid")?;
        let projects = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(id, name, created_at)| -> Result<ProjectRecord> {
                Ok(ProjectRecord {
                    id: parse_uuid(&id)?,
                    name,
                    created_at: parse_datetime(&created_at)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, description, status, priority, created_at
             FROM tickets ORDER BY rowid",
        )?;
        let tickets = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(
                |(id, project_id, title, description, status, priority, created_at)| -> Result<TicketRecord> {
                    Ok(TicketRecord {
                        id: parse_uuid(&id)?,
                        project_id: parse_uuid(&project_id)?,
                        title,
                        description,
                        status: Status::from_str(&status)
                            .with_context(|| format!("Unknown ticket status '{status}'"))?,
                        priority: Priority::from_str(&priority)
                            .with_context(|| format!("Unknown ticket priority '{priority}'"))?,
                        created_at: parse_datetime(&created_at)?,
                    })
                },
            )
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT id, ticket_id, text, completed FROM instructions ORDER BY rowid")?;
        let instructions = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(id, ticket_id, text, completed)| -> Result<InstructionRecord> {
                Ok(InstructionRecord {
                    id: parse_uuid(&id)?,
                    ticket_id: parse_uuid(&ticket_id)?,
                    text,
                    completed,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(assemble(projects, tickets, instructions))
    }
}

/// `<data dir>/kanban.db` under the platform's per-user data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "kanban-board")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("kanban.db"))
}

fn is_constraint_violation(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid id '{s}' in database"))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{s}' in database"))
}
