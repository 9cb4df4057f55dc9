//! Editor abstraction the workflow commands dispatch through.

use super::document::{EditError, EditPlan, TextDocument};

/// An editable buffer with a cursor.
///
/// Implementations apply each plan as a single atomic transaction.
pub trait Editor {
    /// The current document.
    fn document(&self) -> &TextDocument;

    /// Cursor position as a byte offset.
    fn cursor(&self) -> usize;

    /// Apply a plan and move the cursor.
    fn dispatch(&mut self, plan: &EditPlan) -> Result<(), EditError>;
}

/// In-memory editor used by the CLI and tests.
#[derive(Debug, Clone)]
pub struct BufferEditor {
    doc: TextDocument,
    cursor: usize,
}

impl BufferEditor {
    /// Create an editor with the cursor at the start of the text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { doc: TextDocument::new(text), cursor: 0 }
    }

    /// Place the cursor at the end of a 1-based line.
    ///
    /// Returns `None` if the line does not exist.
    pub fn at_line_end(text: impl Into<String>, line_number: usize) -> Option<Self> {
        let mut editor = Self::new(text);
        let end = editor.doc.line(line_number)?.to;
        editor.cursor = end;
        Some(editor)
    }

    /// Move the cursor, clamped to the document length.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.doc.len());
    }

    /// The text of the buffer.
    pub fn text(&self) -> &str {
        self.doc.text()
    }

    /// Consume the editor and return its text.
    pub fn into_text(self) -> String {
        self.doc.into_text()
    }
}

impl Editor for BufferEditor {
    fn document(&self) -> &TextDocument {
        &self.doc
    }

    fn cursor(&self) -> usize {
        self.cursor
    }

    fn dispatch(&mut self, plan: &EditPlan) -> Result<(), EditError> {
        self.doc.apply(&plan.changes)?;
        let cursor = plan.cursor.unwrap_or(self.cursor);
        self.set_cursor(cursor);
        Ok(())
    }
}
