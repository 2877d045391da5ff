// src/command/state.rs

use std::fmt;

/// Lifecycle state of a [`Command`](super::Command).
///
/// ```text
/// New -> Executing -> Successful | Failed | Signaled | TimedOut
/// New -> Skipped
/// ```
///
/// Transitions only move forward; terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandState {
    New,
    Executing,
    Successful,
    Failed,
    Signaled,
    TimedOut,
    Skipped,
}

impl CommandState {
    /// Failed by exit code/assertion, by signal, or by timeout.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CommandState::Failed | CommandState::Signaled | CommandState::TimedOut
        )
    }

    /// Neither `New` nor `Executing`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CommandState::New | CommandState::Executing)
    }

    /// Whether moving from `self` to `next` is a legal forward step.
    pub fn can_transition_to(self, next: CommandState) -> bool {
        match self {
            CommandState::New => matches!(next, CommandState::Executing | CommandState::Skipped),
            CommandState::Executing => next.is_terminal() && next != CommandState::Skipped,
            _ => false,
        }
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandState::New => "new",
            CommandState::Executing => "executing",
            CommandState::Successful => "successful",
            CommandState::Failed => "failed",
            CommandState::Signaled => "signaled",
            CommandState::TimedOut => "timed out",
            CommandState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
