//! Line-indexed text buffer with atomic change batches.
//!
//! Lines are 1-indexed and carry byte offsets into the full text, so a
//! synthesized edit can address a line by `from..to`. A batch of changes is
//! validated as a whole before anything is written; a rejected batch leaves
//! the document untouched.

use serde::Serialize;
use thiserror::Error;

/// A single line of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number
    pub number: usize,

    /// Byte offset of the first character
    pub from: usize,

    /// Byte offset just past the last character, excluding the line break
    pub to: usize,

    /// Line contents without the line break
    pub text: &'a str,
}

/// Replacement of the byte range `from..to` with `insert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl Change {
    /// Create a replacement change.
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self { from, to, insert: insert.into() }
    }

    /// Create a pure insertion at `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    /// Create a change replacing the whole text of `line`.
    pub fn replace_line(line: &Line<'_>, text: impl Into<String>) -> Self {
        Self::new(line.from, line.to, text)
    }

    /// Net length difference this change causes.
    fn delta(&self) -> isize {
        self.insert.len() as isize - (self.to - self.from) as isize
    }
}

/// Errors raised when a change batch cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Change reaches past the end of the document.
    #[error("Change {from}..{to} is outside the document (length {len})")]
    OutOfRange { from: usize, to: usize, len: usize },

    /// Change end precedes its start.
    #[error("Change range {from}..{to} is inverted")]
    Inverted { from: usize, to: usize },

    /// Change starts before the previous change ends.
    #[error("Change starting at {0} overlaps or precedes the previous change")]
    Overlapping(usize),

    /// Change boundary splits a UTF-8 character.
    #[error("Offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// One atomic batch of changes plus the cursor to place afterwards.
///
/// The cursor is expressed in coordinates of the document *after* the batch
/// has been applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditPlan {
    /// Changes in ascending, non-overlapping order
    pub changes: Vec<Change>,

    /// Cursor position after dispatch
    pub cursor: Option<usize>,
}

impl EditPlan {
    /// A plan that does nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check whether applying this plan would change the document.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes in the batch.
    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Position, after the whole batch is applied, of byte `offset` inside the
/// inserted text of `changes[index]`.
///
/// `changes` must be sorted by `from`.
pub fn position_in_insert(changes: &[Change], index: usize, offset: usize) -> usize {
    let shift: isize = changes[..index].iter().map(Change::delta).sum();
    (changes[index].from as isize + shift) as usize + offset
}

/// An editable, line-indexed text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    /// Create a document from text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self { text, line_starts }
    }

    /// Full document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the document and return its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Document length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the document has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines. An empty document has one empty line.
    pub fn lines(&self) -> usize {
        self.line_starts.len()
    }

    /// Get a line by its 1-based number.
    pub fn line(&self, number: usize) -> Option<Line<'_>> {
        if number == 0 || number > self.line_starts.len() {
            return None;
        }

        let from = self.line_starts[number - 1];
        let mut to = self.line_starts.get(number).map_or(self.text.len(), |next| next - 1);
        if self.text[from..to].ends_with('\r') {
            to -= 1;
        }

        Some(Line { number, from, to, text: &self.text[from..to] })
    }

    /// Get the line containing byte position `pos`.
    pub fn line_at(&self, pos: usize) -> Option<Line<'_>> {
        if pos > self.text.len() {
            return None;
        }
        let number = match self.line_starts.binary_search(&pos) {
            Ok(index) => index + 1,
            Err(index) => index,
        };
        self.line(number)
    }

    /// Iterate over all lines in order.
    pub fn iter(&self) -> impl Iterator<Item = Line<'_>> {
        (1..=self.lines()).filter_map(move |number| self.line(number))
    }

    /// Line break used by the document, taken from its first line.
    ///
    /// Documents without a line break get `"\n"`.
    pub fn line_ending(&self) -> &'static str {
        match self.text.find('\n') {
            Some(index) if self.text[..index].ends_with('\r') => "\r\n",
            _ => "\n",
        }
    }

    /// Apply a batch of changes atomically.
    ///
    /// The batch is validated first: every change must lie within the
    /// document, on character boundaries, sorted by start and
    /// non-overlapping. On error the document is unchanged.
    pub fn apply(&mut self, changes: &[Change]) -> Result<(), EditError> {
        let len = self.text.len();
        let mut previous_end = 0;

        for change in changes {
            if change.to < change.from {
                return Err(EditError::Inverted { from: change.from, to: change.to });
            }
            if change.to > len {
                return Err(EditError::OutOfRange { from: change.from, to: change.to, len });
            }
            if change.from < previous_end {
                return Err(EditError::Overlapping(change.from));
            }
            for offset in [change.from, change.to] {
                if !self.text.is_char_boundary(offset) {
                    return Err(EditError::NotCharBoundary(offset));
                }
            }
            previous_end = change.to;
        }

        let extra: isize = changes.iter().map(Change::delta).sum();
        let mut output = String::with_capacity((len as isize + extra.max(0)) as usize);
        let mut cursor = 0;
        for change in changes {
            output.push_str(&self.text[cursor..change.from]);
            output.push_str(&change.insert);
            cursor = change.to;
        }
        output.push_str(&self.text[cursor..]);

        self.line_starts = compute_line_starts(&output);
        self.text = output;
        Ok(())
    }
}

impl std::fmt::Display for TextDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0).chain(text.match_indices('\n').map(|(index, _)| index + 1)).collect()
}
