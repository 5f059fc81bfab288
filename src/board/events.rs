use uuid::Uuid;

/// Emitted after every board mutation so views can re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    ProjectCreated { project_id: Uuid },
    ProjectRenamed { project_id: Uuid },
    /// The project and every ticket it held are gone.
    ProjectDeleted { project_id: Uuid },
    TicketCreated { project_id: Uuid, ticket_id: Uuid },
    /// Any field of the ticket changed: status, priority, title or description.
    TicketUpdated { project_id: Uuid, ticket_id: Uuid },
    TicketDeleted { project_id: Uuid, ticket_id: Uuid },
    InstructionAdded { ticket_id: Uuid, instruction_id: Uuid },
    /// Toggled or re-worded.
    InstructionUpdated { ticket_id: Uuid, instruction_id: Uuid },
    InstructionRemoved { ticket_id: Uuid, instruction_id: Uuid },
}

/// Handle returned by [`Board::subscribe`](super::Board::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&BoardEvent)>;

#[derive(Default)]
pub(super) struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    pub(super) fn add(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(super) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub(super) fn emit(&mut self, event: &BoardEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub(super) fn len(&self) -> usize {
        self.listeners.len()
    }
}
