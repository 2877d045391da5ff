//! In-memory terminal for asserting on what the runner paints.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bugger::render::{FixedSize, Terminal};

/// A `Write` sink whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, escape sequences included.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }

    /// Everything written so far with escape sequences removed.
    pub fn plain(&self) -> String {
        strip_ansi(&self.contents())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A terminal of the given size writing into two buffers.
pub struct CapturedTerminal {
    pub terminal: Terminal,
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
}

pub fn capture_terminal(rows: u16, cols: u16) -> CapturedTerminal {
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    let terminal = Terminal::new(
        Box::new(stdout.clone()),
        Box::new(stderr.clone()),
        Arc::new(FixedSize::new(rows, cols)),
    );
    CapturedTerminal {
        terminal,
        stdout,
        stderr,
    }
}

/// Remove CSI (`ESC [ ... final`) and two-byte (`ESC 7`) escape sequences.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
    }
    out
}

/// Printable lines: escapes stripped, each `\r`-separated overwrite reduced
/// to its last segment, indentation trimmed, blank lines dropped.
pub fn visible_lines(s: &str) -> Vec<String> {
    strip_ansi(s)
        .split('\n')
        .map(|line| line.rsplit('\r').next().unwrap_or_default().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
