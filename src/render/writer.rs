// src/render/writer.rs

//! Width-aware, indentation-aware line writer over one output stream.

use std::fmt::Display;
use std::io::Write;
use std::sync::Arc;

use crossterm::queue;
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use super::terminal::TerminalSize;

/// Columns per indentation level.
pub const INDENT_WIDTH: usize = 2;

/// Writes logical lines to one stream.
///
/// Every line starts with [`Writer::begin`], which returns the cursor to the
/// first column, indents, and erases whatever a previous (possibly longer)
/// line left behind. Printable text is clamped to the terminal width; escape
/// sequences are never counted.
///
/// I/O errors are ignored: the terminal is a best-effort sink and a broken
/// pipe must not abort the run.
pub struct Writer {
    out: Box<dyn Write + Send>,
    size: Arc<dyn TerminalSize>,
    indentation: usize,
    clean: bool,
    pos: usize,
}

impl Writer {
    pub fn new(out: Box<dyn Write + Send>, size: Arc<dyn TerminalSize>) -> Self {
        Self {
            out,
            size,
            indentation: 0,
            clean: true,
            pos: 0,
        }
    }

    pub fn increment(&mut self) {
        self.indentation += 1;
    }

    pub fn decrement(&mut self) {
        self.indentation = self.indentation.saturating_sub(1);
    }

    /// `true` when the last line was terminated (or nothing was written yet).
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Start a fresh logical line.
    pub fn begin(&mut self) -> &mut Self {
        self.pos = 0;
        self.raw("\r");
        let indent = " ".repeat(self.indentation * INDENT_WIDTH);
        self.text(indent);
        let _ = queue!(self.out, Clear(ClearType::UntilNewLine));
        self.flush()
    }

    /// Printable text, truncated at the right edge of the terminal.
    pub fn text(&mut self, t: impl Display) -> &mut Self {
        let t = t.to_string();
        let room = self.columns().saturating_sub(self.pos);
        let clipped: String = t.chars().take(room).collect();
        self.pos += clipped.chars().count();
        self.write_str(&clipped)
    }

    /// Bytes that do not move the cursor (escape sequences, `\r`, `\n`).
    pub fn raw(&mut self, t: impl Display) -> &mut Self {
        self.write_str(&t.to_string())
    }

    /// Queue a crossterm command; it never counts towards the position and
    /// does not leave the line dirty.
    pub fn command(&mut self, cmd: impl crossterm::Command) -> &mut Self {
        let _ = queue!(self.out, cmd);
        self.flush()
    }

    pub fn colored(&mut self, color: Color, t: impl Display) -> &mut Self {
        let _ = queue!(self.out, SetForegroundColor(color));
        self.text(t);
        let _ = queue!(self.out, ResetColor);
        self.flush()
    }

    pub fn red(&mut self, t: impl Display) -> &mut Self {
        self.colored(Color::DarkRed, t)
    }

    pub fn green(&mut self, t: impl Display) -> &mut Self {
        self.colored(Color::DarkGreen, t)
    }

    pub fn yellow(&mut self, t: impl Display) -> &mut Self {
        self.colored(Color::DarkYellow, t)
    }

    pub fn blue(&mut self, t: impl Display) -> &mut Self {
        self.colored(Color::DarkBlue, t)
    }

    /// Terminate the current line.
    pub fn end(&mut self) -> &mut Self {
        self.finish(true)
    }

    /// Terminate the current logical line, optionally without the `\n`.
    pub fn finish(&mut self, newline: bool) -> &mut Self {
        if newline {
            self.raw("\n");
        }
        self.clean = true;
        self.pos = 0;
        self
    }

    fn write_str(&mut self, s: &str) -> &mut Self {
        if !s.is_empty() {
            let _ = self.out.write_all(s.as_bytes());
            self.clean = false;
        }
        self.flush()
    }

    fn flush(&mut self) -> &mut Self {
        let _ = self.out.flush();
        self
    }

    fn columns(&self) -> usize {
        usize::from(self.size.size().1)
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("indentation", &self.indentation)
            .field("clean", &self.clean)
            .field("pos", &self.pos)
            .finish()
    }
}
