// src/render/mod.rs

//! Terminal rendering.
//!
//! - [`writer`]: one stream with indentation, width clamping and colours.
//! - [`terminal`]: stdout + stderr writers and cursor addressing.
//! - [`animation`]: glyphs, the spinner and the repaint timer.
//!
//! All painting goes through a single [`Screen`] behind a mutex. The run loop
//! and the animation timer both take the lock for a whole logical line.

pub mod animation;
pub mod terminal;
pub mod writer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use animation::{FAILURE, FRAMES, HOURGLASS, SUCCESS, Spinner, TICK, Ticker};
pub use terminal::{FixedSize, LiveSize, Terminal, TerminalSize};
pub use writer::Writer;

/// The line the animation timer keeps repainting while a command runs.
#[derive(Debug, Clone)]
pub struct ActiveLine {
    pub label: String,
    pub invocation: String,
    pub spinner: Spinner,
}

#[derive(Debug)]
pub struct Screen {
    pub term: Terminal,
    active: Option<ActiveLine>,
}

pub type SharedScreen = Arc<Mutex<Screen>>;

impl Screen {
    pub fn new(term: Terminal) -> Self {
        Self { term, active: None }
    }

    pub fn shared(term: Terminal) -> SharedScreen {
        Arc::new(Mutex::new(Self::new(term)))
    }

    /// Mark a command as running and paint its first frame.
    pub fn set_active(&mut self, line: ActiveLine) {
        self.active = Some(line);
        self.paint_active();
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&ActiveLine> {
        self.active.as_ref()
    }

    /// Repaint the running command's line with the next spinner frame.
    /// Does nothing when no command is running.
    pub fn paint_active(&mut self) {
        let Some(line) = self.active.as_mut() else {
            return;
        };
        let frame = line.spinner.advance();
        self.term
            .stdout()
            .yellow(format!("{frame} {}", line.label))
            .text(": ")
            .blue(&line.invocation);
    }
}

/// Lock the screen, recovering from a painter that panicked mid-line.
pub fn lock(screen: &SharedScreen) -> MutexGuard<'_, Screen> {
    screen.lock().unwrap_or_else(PoisonError::into_inner)
}
