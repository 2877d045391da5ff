// src/template/scanner.rs

//! Locating `${...}` / `$(...)` references and their closing brackets.

use super::TemplateError;

/// Which of the two reference forms a match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// `${...}`: variable lookup with optional filters / default.
    Variable,
    /// `$(...)`: shell evaluation.
    Shell,
}

impl RefKind {
    fn from_open(b: u8) -> Option<Self> {
        match b {
            b'{' => Some(RefKind::Variable),
            b'(' => Some(RefKind::Shell),
            _ => None,
        }
    }

    fn close(self) -> u8 {
        match self {
            RefKind::Variable => b'}',
            RefKind::Shell => b')',
        }
    }
}

/// A located reference: byte offsets of the leading `$` and the closing
/// bracket, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub kind: RefKind,
    pub start: usize,
    pub end: usize,
}

impl Reference {
    /// The text between the brackets.
    pub fn inner<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start + 2..self.end]
    }
}

/// Find the first reference in `s`.
///
/// Returns `Ok(None)` when `s` holds no reference at all, and
/// [`TemplateError::MissingClosingBracket`] when the first one is never closed.
///
/// Nested openers of either kind push their own closer, so a `}` inside a
/// nested `$(...)` does not terminate an enclosing `${...}`. All delimiters
/// are ASCII, so byte offsets are always valid char boundaries.
pub fn find_reference(s: &str) -> Result<Option<Reference>, TemplateError> {
    let bytes = s.as_bytes();
    let Some((start, kind)) = find_opener(bytes, 0) else {
        return Ok(None);
    };

    let mut expected = vec![kind.close()];
    let mut i = start + 2;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if let Some(nested) = bytes.get(i + 1).copied().and_then(RefKind::from_open) {
                expected.push(nested.close());
                i += 2;
                continue;
            }
        }
        if Some(&bytes[i]) == expected.last() {
            expected.pop();
            if expected.is_empty() {
                return Ok(Some(Reference { kind, start, end: i }));
            }
        }
        i += 1;
    }

    Err(TemplateError::MissingClosingBracket)
}

fn find_opener(bytes: &[u8], from: usize) -> Option<(usize, RefKind)> {
    (from..bytes.len().saturating_sub(1)).find_map(|i| {
        if bytes[i] == b'$' {
            RefKind::from_open(bytes[i + 1]).map(|k| (i, k))
        } else {
            None
        }
    })
}

/// `true` if `s` contains at least one reference opener.
pub fn has_reference(s: &str) -> bool {
    find_opener(s.as_bytes(), 0).is_some()
}
