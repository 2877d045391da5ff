// src/render/terminal.rs

//! The two output streams plus cursor addressing.

use std::fmt::Debug;
use std::io::{IsTerminal, Write};
use std::sync::Arc;

use crossterm::cursor::{MoveTo, RestorePosition, SavePosition};
use crossterm::terminal::{Clear, ClearType};

use super::writer::Writer;

/// Rows and columns used when stdout is not a terminal.
pub const FALLBACK_SIZE: (u16, u16) = (25, 80);

/// Source of the current terminal dimensions, as `(rows, columns)`.
///
/// Queried on every write so a resize takes effect immediately.
pub trait TerminalSize: Send + Sync + Debug {
    fn size(&self) -> (u16, u16);
}

/// Queries the controlling terminal; falls back to [`FALLBACK_SIZE`] when
/// stdout is redirected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveSize;

impl TerminalSize for LiveSize {
    fn size(&self) -> (u16, u16) {
        if !std::io::stdout().is_terminal() {
            return FALLBACK_SIZE;
        }
        match crossterm::terminal::size() {
            Ok((cols, rows)) => (rows, cols),
            Err(_) => FALLBACK_SIZE,
        }
    }
}

/// A fixed size, for tests and non-interactive output.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize {
    pub rows: u16,
    pub cols: u16,
}

impl FixedSize {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl TerminalSize for FixedSize {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }
}

#[derive(Debug)]
pub struct Terminal {
    stdout: Writer,
    stderr: Writer,
    size: Arc<dyn TerminalSize>,
}

impl Terminal {
    pub fn new(
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
        size: Arc<dyn TerminalSize>,
    ) -> Self {
        Self {
            stdout: Writer::new(stdout, Arc::clone(&size)),
            stderr: Writer::new(stderr, Arc::clone(&size)),
            size,
        }
    }

    /// The process's real stdout/stderr.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(std::io::stdout()),
            Box::new(std::io::stderr()),
            Arc::new(LiveSize),
        )
    }

    /// Begin a new line on stdout.
    pub fn stdout(&mut self) -> &mut Writer {
        self.stdout.begin()
    }

    /// Begin a new line on stderr.
    pub fn stderr(&mut self) -> &mut Writer {
        self.stderr.begin()
    }

    /// The stdout writer without starting a new line.
    pub fn stdout_writer(&mut self) -> &mut Writer {
        &mut self.stdout
    }

    /// Enter a nested scope: everything written until [`Terminal::leave`] is
    /// indented one level deeper.
    pub fn enter(&mut self) {
        self.stdout.increment();
        self.stderr.increment();
    }

    /// Leave the current scope, terminating any line left dangling in it.
    pub fn leave(&mut self) {
        if !self.stdout.is_clean() {
            self.stdout.end();
        }
        if !self.stderr.is_clean() {
            self.stderr.end();
        }
        self.stdout.decrement();
        self.stderr.decrement();
    }

    /// Move the cursor; `row` and `col` are 1-based.
    pub fn goto(&mut self, row: u16, col: u16) {
        self.stdout
            .command(MoveTo(col.saturating_sub(1), row.saturating_sub(1)));
    }

    pub fn clear_screen(&mut self) {
        self.stdout.command(Clear(ClearType::All));
    }

    pub fn save_pos(&mut self) {
        self.stdout.command(SavePosition);
    }

    pub fn restore_pos(&mut self) {
        self.stdout.command(RestorePosition);
    }

    pub fn rows(&self) -> u16 {
        self.size.size().0
    }
}
