// src/engine/layout.rs

//! Full-screen listings and the collapse decision.
//!
//! These functions only read group/command state and write to a
//! [`Terminal`]; they never run anything.

use crate::group::CommandGroup;
use crate::render::Terminal;

/// Lines a full listing needs: one per group header, one per command, plus
/// the summary line.
pub fn line_count(groups: &[CommandGroup]) -> usize {
    groups.len() + groups.iter().map(CommandGroup::len).sum::<usize>() + 1
}

/// Collapse when enabled and the full listing would not fit in `rows`.
pub fn should_collapse(enabled: bool, rows: u16, groups: &[CommandGroup]) -> bool {
    enabled && usize::from(rows) < line_count(groups)
}

/// Index of the first group that still has a `New` command.
pub fn current_group(groups: &[CommandGroup]) -> Option<usize> {
    groups.iter().position(|g| !g.finished())
}

/// Clear the screen and list every group with its pending commands. When
/// collapsed only the current group's commands are listed.
pub fn paint_pre_run(term: &mut Terminal, groups: &[CommandGroup], collapsed: bool) {
    let current = current_group(groups);
    term.clear_screen();
    term.goto(1, 1);
    for (idx, group) in groups.iter().enumerate() {
        term.stdout().blue(&group.name).end();
        if !collapsed || current == Some(idx) {
            term.enter();
            for command in &group.commands {
                term.stdout().yellow(command).end();
            }
            term.leave();
        }
    }
}

/// Redraw the collapsed view: failures of finished groups, the live listing
/// of the current group, headers only for everything else.
///
/// The cursor is left on the current group's first command so the run loop
/// overwrites the listing in place.
pub fn paint_collapsed(term: &mut Terminal, groups: &[CommandGroup]) {
    let current = current_group(groups);
    term.clear_screen();
    term.goto(1, 1);
    for (idx, group) in groups.iter().enumerate() {
        term.stdout().blue(&group.name).end();
        if group.finished() {
            term.enter();
            for command in group.failures() {
                term.stdout()
                    .red(command)
                    .text(": ")
                    .blue(command.invocation())
                    .end();
            }
            term.leave();
        } else if current == Some(idx) {
            term.enter();
            for (n, command) in group.commands.iter().enumerate() {
                if n == 0 {
                    term.save_pos();
                }
                term.stdout().yellow(command).end();
            }
            term.leave();
        }
    }
    if current.is_some() {
        term.restore_pos();
    }
}
