// src/group.rs

//! An ordered, named batch of commands.

use crate::command::{Command, CommandState};

/// Groups whose name starts with this are disabled.
pub const DISABLED_MARKER: char = '_';

#[derive(Debug)]
pub struct CommandGroup {
    pub name: String,
    pub commands: Vec<Command>,
}

impl CommandGroup {
    pub fn new(name: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn is_disabled(name: &str) -> bool {
        name.starts_with(DISABLED_MARKER)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// No command has started yet.
    pub fn pending(&self) -> bool {
        self.commands.iter().all(|c| c.state() == CommandState::New)
    }

    /// No command is `New` any more; the last one may still be executing.
    pub fn finished(&self) -> bool {
        self.commands.iter().all(|c| c.state() != CommandState::New)
    }

    pub fn running(&self) -> bool {
        self.commands
            .iter()
            .any(|c| c.state() == CommandState::Executing)
    }

    pub fn failed(&self) -> bool {
        self.commands.iter().any(Command::is_failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.is_failed())
    }
}
