use std::cell::RefCell;
use std::rc::Rc;

use kanban_board::board::{Board, BoardEvent};
use kanban_board::models::*;
use kanban_board::persistence::{EntityKey, MemoryStore, Record};
use kanban_board::Error;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_project(board: &mut Board<MemoryStore>, name: &str) -> Project {
    board.create_project(name).expect("Failed to create project")
}

fn create_test_ticket(
    board: &mut Board<MemoryStore>,
    project_id: Uuid,
    input: CreateTicketInput,
) -> Ticket {
    board
        .create_ticket(project_id, input)
        .expect("Failed to create ticket")
        .expect("Project not found")
}

fn bug_input() -> CreateTicketInput {
    CreateTicketInput {
        title: "Bug".to_string(),
        description: "Crashes on save".to_string(),
        status: Status::Backlog,
        priority: Priority::High,
        instructions: vec!["Repro".to_string(), "Fix".to_string()],
    }
}

speculate! {
    before {
        let mut board = Board::new(MemoryStore::new());
    }

    describe "projects" {
        describe "create_project" {
            it "creates an empty project" {
                let project = create_test_project(&mut board, "Site");

                assert_eq!(project.name, "Site");
                assert_eq!(project.ticket_count(), 0);
                assert_eq!(board.projects().len(), 1);
                assert!(board.persistence().contains(EntityKey::Project(project.id)));
            }

            it "rejects an empty name" {
                let result = board.create_project("");

                assert_eq!(result, Err(Error::Validation { field: "name" }));
                assert!(board.projects().is_empty());
                assert!(board.persistence().is_empty());
            }

            it "rejects a whitespace-only name" {
                assert!(board.create_project("   ").is_err());
                assert!(board.projects().is_empty());
            }

            it "stores the name as given" {
                let project = create_test_project(&mut board, "  Site  ");

                assert_eq!(project.name, "  Site  ");
                assert_eq!(board.project(project.id).unwrap().name, "  Site  ");
            }

            it "keeps projects in creation order" {
                create_test_project(&mut board, "Zebra");
                create_test_project(&mut board, "Alpha");

                let names: Vec<_> = board.projects().iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["Zebra", "Alpha"]);
            }
        }

        describe "rename_project" {
            it "renames and persists" {
                let project = create_test_project(&mut board, "Site");

                assert_eq!(board.rename_project(project.id, "Website"), Ok(true));
                assert_eq!(board.project(project.id).unwrap().name, "Website");
                let stored = board.persistence().get(EntityKey::Project(project.id));
                assert!(matches!(stored, Some(Record::Project(p)) if p.name == "Website"));
            }

            it "is a no-op for a missing project" {
                assert_eq!(board.rename_project(Uuid::new_v4(), "Website"), Ok(false));
            }

            it "validates before looking up" {
                let project = create_test_project(&mut board, "Site");
                assert!(board.rename_project(project.id, "").is_err());
                assert_eq!(board.project(project.id).unwrap().name, "Site");
            }
        }

        describe "delete_project" {
            it "removes every ticket and instruction" {
                let project = create_test_project(&mut board, "P");
                let first = create_test_ticket(&mut board, project.id, bug_input());
                let second = create_test_ticket(&mut board, project.id, CreateTicketInput::titled("Docs"));

                assert!(board.delete_project(project.id));

                assert!(board.project(project.id).is_none());
                assert!(board.project_of(first.id).is_none());
                assert!(board.ticket(second.id).is_none());
                for instruction in &first.instructions {
                    assert!(board.instruction(instruction.id).is_none());
                    assert!(!board.persistence().contains(EntityKey::Instruction(instruction.id)));
                }
                assert_eq!(board.tickets().count(), 0);
                assert!(board.persistence().is_empty());
            }

            it "deletes the whole chain in one save" {
                let project = create_test_project(&mut board, "P");
                create_test_ticket(&mut board, project.id, bug_input());
                let saves = board.persistence().save_count();

                board.delete_project(project.id);

                assert_eq!(board.persistence().save_count(), saves + 1);
            }

            it "leaves other projects alone" {
                let doomed = create_test_project(&mut board, "Old");
                let kept = create_test_project(&mut board, "New");
                let ticket = create_test_ticket(&mut board, kept.id, bug_input());
                create_test_ticket(&mut board, doomed.id, bug_input());

                board.delete_project(doomed.id);

                assert_eq!(board.projects().len(), 1);
                assert_eq!(board.project_of(ticket.id).map(|p| p.id), Some(kept.id));
            }

            it "returns false for a missing project" {
                assert!(!board.delete_project(Uuid::new_v4()));
            }
        }
    }

    describe "tickets" {
        describe "create_ticket" {
            it "applies defaults" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, CreateTicketInput::titled("Bug"));

                assert_eq!(ticket.status, Status::Backlog);
                assert_eq!(ticket.priority, Priority::Medium);
                assert!(ticket.instructions.is_empty());
                assert_eq!(board.project(project.id).unwrap().ticket_count(), 1);
            }

            it "creates one incomplete instruction per text" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                assert_eq!(ticket.instruction_count(), 2);
                assert_eq!(ticket.completed_count(), 0);
                for instruction in &ticket.instructions {
                    assert!(board.persistence().contains(EntityKey::Instruction(instruction.id)));
                }
            }

            it "keeps every checklist text as given" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, CreateTicketInput {
                    instructions: vec!["Repro".to_string(), "".to_string(), "  Fix ".to_string()],
                    ..CreateTicketInput::titled("Bug")
                });

                let texts: Vec<_> = ticket.instructions.iter().map(|i| i.text.as_str()).collect();
                assert_eq!(texts, vec!["Repro", "", "  Fix "]);
                assert_eq!(board.ticket(ticket.id).unwrap().instruction_count(), 3);
            }

            it "stores the title as given" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, CreateTicketInput::titled(" Bug "));

                assert_eq!(ticket.title, " Bug ");
            }

            it "rejects an empty title and leaves the project unchanged" {
                let project = create_test_project(&mut board, "Site");

                let result = board.create_ticket(project.id, CreateTicketInput::titled(""));

                assert_eq!(result, Err(Error::Validation { field: "title" }));
                assert_eq!(board.project(project.id).unwrap().ticket_count(), 0);
            }

            it "returns None for a missing project" {
                let result = board.create_ticket(Uuid::new_v4(), CreateTicketInput::titled("Bug"));
                assert_eq!(result, Ok(None));
                assert_eq!(board.tickets().count(), 0);
            }

            it "appends in creation order" {
                let project = create_test_project(&mut board, "Site");
                create_test_ticket(&mut board, project.id, CreateTicketInput::titled("First"));
                create_test_ticket(&mut board, project.id, CreateTicketInput::titled("Second"));

                let titles: Vec<_> = board.project(project.id).unwrap()
                    .tickets.iter().map(|t| t.title.as_str()).collect();
                assert_eq!(titles, vec!["First", "Second"]);
            }
        }

        describe "set_ticket_status" {
            it "allows any transition" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                assert!(board.set_ticket_status(ticket.id, Status::Done));
                assert_eq!(board.ticket(ticket.id).unwrap().status, Status::Done);

                assert!(board.set_ticket_status(ticket.id, Status::ToDo));
                assert_eq!(board.ticket(ticket.id).unwrap().status, Status::ToDo);
            }

            it "changes only the status" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());
                board.toggle_instruction(ticket.instructions[1].id);
                let before = board.ticket(ticket.id).unwrap().clone();

                board.set_ticket_status(ticket.id, Status::Done);
                board.set_ticket_status(ticket.id, Status::Backlog);

                let after = board.ticket(ticket.id).unwrap();
                assert_eq!(after.priority, before.priority);
                assert_eq!(after.instructions, before.instructions);
                assert_eq!(after, &before);
            }

            it "persists the new status" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                board.set_ticket_status(ticket.id, Status::ToTest);

                let stored = board.persistence().get(EntityKey::Ticket(ticket.id));
                assert!(matches!(stored, Some(Record::Ticket(t)) if t.status == Status::ToTest));
            }

            it "is a no-op for the current status" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());
                let saves = board.persistence().save_count();

                assert!(!board.set_ticket_status(ticket.id, Status::Backlog));
                assert_eq!(board.persistence().save_count(), saves);
            }

            it "is a no-op for a missing ticket" {
                assert!(!board.set_ticket_status(Uuid::new_v4(), Status::Done));
            }
        }

        describe "set_ticket_priority" {
            it "overwrites the priority" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                assert!(board.set_ticket_priority(ticket.id, Priority::Low));
                assert_eq!(board.ticket(ticket.id).unwrap().priority, Priority::Low);
                assert_eq!(board.ticket(ticket.id).unwrap().status, Status::Backlog);
            }
        }

        describe "update_ticket" {
            it "updates only provided fields" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                let updated = board.update_ticket(ticket.id, UpdateTicketInput {
                    description: Some(String::new()),
                    status: Some(Status::ToDo),
                    ..Default::default()
                }).expect("Update failed").expect("Ticket not found");

                assert_eq!(updated.title, "Bug");
                assert_eq!(updated.description, "");
                assert_eq!(updated.status, Status::ToDo);
                assert_eq!(updated.priority, Priority::High);
                assert_eq!(board.ticket(ticket.id), Some(&updated));
            }

            it "rejects an empty title" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                let result = board.update_ticket(ticket.id, UpdateTicketInput {
                    title: Some(" ".to_string()),
                    status: Some(Status::Done),
                    ..Default::default()
                });

                assert!(result.is_err());
                assert_eq!(board.ticket(ticket.id).unwrap().status, Status::Backlog);
            }

            it "returns None for a missing ticket" {
                let result = board.update_ticket(Uuid::new_v4(), UpdateTicketInput::default());
                assert_eq!(result, Ok(None));
            }
        }

        describe "delete_ticket" {
            it "empties the project and its instructions" {
                let project = create_test_project(&mut board, "X");
                let ticket = create_test_ticket(&mut board, project.id, CreateTicketInput {
                    instructions: vec!["Step".to_string()],
                    ..CreateTicketInput::titled("Y")
                });

                assert!(board.delete_ticket(ticket.id));

                assert!(board.project(project.id).unwrap().tickets.is_empty());
                assert!(board.instruction(ticket.instructions[0].id).is_none());
                assert!(!board.persistence().contains(EntityKey::Ticket(ticket.id)));
                assert!(!board.persistence().contains(EntityKey::Instruction(ticket.instructions[0].id)));
            }

            it "returns false when already deleted" {
                let project = create_test_project(&mut board, "X");
                let ticket = create_test_ticket(&mut board, project.id, CreateTicketInput::titled("Y"));

                assert!(board.delete_ticket(ticket.id));
                assert!(!board.delete_ticket(ticket.id));
            }
        }
    }

    describe "instructions" {
        describe "toggle_instruction" {
            it "updates the completion ratio" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                assert_eq!(board.toggle_instruction(ticket.instructions[0].id), Some(true));

                let ticket = board.ticket(ticket.id).unwrap();
                assert_eq!(ticket.completed_count(), 1);
                assert_eq!(ticket.instruction_count(), 2);
                assert_eq!(ticket.completion_ratio(), 0.5);
            }

            it "flips back" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());
                let id = ticket.instructions[0].id;

                board.toggle_instruction(id);
                assert_eq!(board.toggle_instruction(id), Some(false));
                let stored = board.persistence().get(EntityKey::Instruction(id));
                assert!(matches!(stored, Some(Record::Instruction(i)) if !i.completed));
            }

            it "returns None for a missing instruction" {
                assert_eq!(board.toggle_instruction(Uuid::new_v4()), None);
            }
        }

        describe "add_instruction" {
            it "appends an incomplete instruction" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                let added = board.add_instruction(ticket.id, "Verify")
                    .expect("Add failed").expect("Ticket not found");

                let ticket = board.ticket(ticket.id).unwrap();
                assert!(!added.completed);
                assert_eq!(ticket.instructions.last(), Some(&added));
                assert_eq!(board.ticket_of(added.id).map(|t| t.id), Some(ticket.id));
            }

            it "rejects empty text" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());

                assert_eq!(
                    board.add_instruction(ticket.id, ""),
                    Err(Error::Validation { field: "instruction" })
                );
                assert_eq!(board.ticket(ticket.id).unwrap().instruction_count(), 2);
            }
        }

        describe "set_instruction_text" {
            it "rewords the instruction" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());
                let id = ticket.instructions[0].id;

                assert_eq!(board.set_instruction_text(id, "Reproduce"), Ok(true));
                assert_eq!(board.instruction(id).unwrap().text, "Reproduce");
            }
        }

        describe "remove_instruction" {
            it "removes and deletes the instruction" {
                let project = create_test_project(&mut board, "Site");
                let ticket = create_test_ticket(&mut board, project.id, bug_input());
                let id = ticket.instructions[0].id;

                assert!(board.remove_instruction(ticket.id, id));

                assert!(board.instruction(id).is_none());
                assert!(!board.persistence().contains(EntityKey::Instruction(id)));
                assert_eq!(board.ticket(ticket.id).unwrap().instructions[0].text, "Fix");
            }

            it "ignores an instruction from another ticket" {
                let project = create_test_project(&mut board, "Site");
                let first = create_test_ticket(&mut board, project.id, bug_input());
                let second = create_test_ticket(&mut board, project.id, bug_input());

                assert!(!board.remove_instruction(second.id, first.instructions[0].id));
                assert_eq!(board.ticket(first.id).unwrap().instruction_count(), 2);
            }
        }
    }

    describe "reads" {
        it "groups tickets into columns by rank" {
            let project = create_test_project(&mut board, "Site");
            let a = create_test_ticket(&mut board, project.id, CreateTicketInput::titled("A"));
            let b = create_test_ticket(&mut board, project.id, CreateTicketInput::titled("B"));
            board.set_ticket_status(b.id, Status::Done);

            let columns = board.columns(project.id).unwrap();
            let statuses: Vec<_> = columns.iter().map(|c| c.status).collect();
            assert_eq!(statuses, Status::ALL.to_vec());
            assert_eq!(columns[0].tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a.id]);
            assert_eq!(columns[3].tickets.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b.id]);
        }

        it "resolves back-references to the owning collection" {
            let project = create_test_project(&mut board, "Site");
            let ticket = create_test_ticket(&mut board, project.id, bug_input());

            let owner = board.project_of(ticket.id).unwrap();
            assert!(owner.tickets.iter().any(|t| t.id == ticket.id));
            for instruction in &ticket.instructions {
                let parent = board.ticket_of(instruction.id).unwrap();
                assert!(parent.instructions.iter().any(|i| i.id == instruction.id));
            }
        }

        it "returns None for columns of a missing project" {
            assert!(board.columns(Uuid::new_v4()).is_none());
        }
    }

    describe "events" {
        it "notifies subscribers after each mutation" {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&seen);
            board.subscribe(move |event| sink.borrow_mut().push(*event));

            let project = create_test_project(&mut board, "Site");
            let ticket = create_test_ticket(&mut board, project.id, bug_input());
            let instruction = ticket.instructions[0].id;
            board.toggle_instruction(instruction);
            board.remove_instruction(ticket.id, instruction);
            board.delete_ticket(ticket.id);

            assert_eq!(*seen.borrow(), vec![
                BoardEvent::ProjectCreated { project_id: project.id },
                BoardEvent::TicketCreated { project_id: project.id, ticket_id: ticket.id },
                BoardEvent::InstructionUpdated { ticket_id: ticket.id, instruction_id: instruction },
                BoardEvent::InstructionRemoved { ticket_id: ticket.id, instruction_id: instruction },
                BoardEvent::TicketDeleted { project_id: project.id, ticket_id: ticket.id },
            ]);
        }

        it "does not notify on rejected input" {
            let count = Rc::new(RefCell::new(0));
            let sink = Rc::clone(&count);
            board.subscribe(move |_| *sink.borrow_mut() += 1);

            let _ = board.create_project("");

            assert_eq!(*count.borrow(), 0);
        }
    }
}
