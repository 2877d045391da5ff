// src/render/animation.rs

//! Status glyphs, the spinner, and the periodic repaint task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use super::{SharedScreen, lock};

pub const HOURGLASS: char = '\u{29d6}';
pub const SUCCESS: char = '\u{2714}';
pub const FAILURE: char = '\u{2718}';

/// Braille fill-up sequence, played forwards then backwards.
pub const FRAMES: [char; 28] = [
    '\u{2840}', '\u{2844}', '\u{2846}', '\u{2847}', '\u{284f}', '\u{285f}', '\u{287f}',
    '\u{28ff}', '\u{28bf}', '\u{28bb}', '\u{28b9}', '\u{28b8}', '\u{28b0}', '\u{28a0}',
    '\u{2880}', '\u{28a0}', '\u{28b0}', '\u{28b8}', '\u{28b9}', '\u{28bb}', '\u{28bf}',
    '\u{28ff}', '\u{287f}', '\u{285f}', '\u{284f}', '\u{2847}', '\u{2846}', '\u{2844}',
];

/// Repaint period of the animation.
pub const TICK: Duration = Duration::from_millis(100);

/// Cyclic position in [`FRAMES`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Spinner {
    idx: usize,
}

impl Spinner {
    /// The frame to show now, without advancing.
    pub fn current(&self) -> char {
        FRAMES[self.idx]
    }

    /// Return the current frame and advance, wrapping at the end.
    pub fn advance(&mut self) -> char {
        let frame = FRAMES[self.idx];
        self.idx = (self.idx + 1) % FRAMES.len();
        frame
    }
}

/// Handle to the background repaint task.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Repaint the active line of `screen` every `period`.
    ///
    /// The task only reads the active line and writes the terminal, both
    /// under the screen lock, so its output never interleaves with a line
    /// being painted by the run loop.
    pub fn spawn(screen: SharedScreen, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                lock(&screen).paint_active();
            }
        });
        debug!(period_ms = period.as_millis() as u64, "animation timer started");
        Self { handle }
    }

    /// Stop the task; once this returns no further repaint can happen.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
        debug!("animation timer stopped");
    }
}
