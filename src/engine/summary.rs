// src/engine/summary.rs

use std::fmt;

use crate::command::CommandState;
use crate::group::CommandGroup;
use crate::render::Writer;

/// Final per-state counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub signaled: usize,
    pub timed_out: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn of(groups: &[CommandGroup]) -> Self {
        let mut summary = Summary::default();
        for command in groups.iter().flat_map(|g| &g.commands) {
            summary.total += 1;
            match command.state() {
                CommandState::Successful => summary.successful += 1,
                CommandState::Failed => summary.failed += 1,
                CommandState::Signaled => summary.signaled += 1,
                CommandState::TimedOut => summary.timed_out += 1,
                CommandState::Skipped => summary.skipped += 1,
                CommandState::New | CommandState::Executing => {}
            }
        }
        summary
    }

    /// Every command succeeded.
    pub fn all_successful(&self) -> bool {
        self.successful == self.total
    }

    pub fn exit_code(&self) -> i32 {
        if self.all_successful() { 0 } else { 1 }
    }

    /// Paint the coloured summary line on a fresh line of `out`.
    pub fn paint(&self, out: &mut Writer, newline: bool) {
        out.begin()
            .blue(self.total)
            .text(" commands. ")
            .green(self.successful)
            .text(" successfull, ")
            .red(self.failed)
            .text(" failed, ")
            .yellow(self.signaled)
            .text(" signaled, ")
            .blue(self.timed_out)
            .text(" timed out, ")
            .text(self.skipped)
            .text(" skipped")
            .finish(newline);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commands. {} successfull, {} failed, {} signaled, {} timed out, {} skipped",
            self.total, self.successful, self.failed, self.signaled, self.timed_out, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_is_successful() {
        let summary = Summary::of(&[]);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            summary.to_string(),
            "0 commands. 0 successfull, 0 failed, 0 signaled, 0 timed out, 0 skipped"
        );
    }

    #[test]
    fn any_non_success_fails_the_run() {
        let summary = Summary {
            total: 2,
            successful: 1,
            skipped: 1,
            ..Summary::default()
        };
        assert_eq!(summary.exit_code(), 1);
    }
}
