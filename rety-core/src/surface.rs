//! Editing surfaces and the primitives that mutate them
//!
//! [`EditSurface`] is the capability contract recording and replay address:
//! a value, a selection, focus, and a stable identity. Mutation goes
//! through an [`EditApplier`], the host-specific collaborator that performs
//! one primitive edit at a time.
//!
//! [`TextBuffer`] and [`BufferEditor`] are an in-memory implementation of
//! both, used by the CLI and by tests.

use async_trait::async_trait;

use crate::action::{KeyStroke, Span};

/// A text-editing target that can be recorded from and replayed into.
///
/// Offsets are character offsets into [`EditSurface::value`].
pub trait EditSurface: Send {
    /// Stable identity of this surface
    fn identity(&self) -> &str;

    /// Class-like markers; a `lang-`/`language-` marker names the surface
    /// when several are routed together
    fn markers(&self) -> &[String] {
        &[]
    }

    /// Whether an event target lies within this surface's content
    fn contains(&self, target: &str) -> bool {
        target == self.identity()
    }

    /// Current value
    fn value(&self) -> String;

    /// Current selection
    fn selection(&self) -> Span;

    /// Move the caret or select a range
    fn set_selection(&mut self, start: usize, end: usize);

    fn focus(&mut self);

    fn blur(&mut self);

    fn is_focused(&self) -> bool;
}

/// One primitive edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp<'a> {
    /// Insert text at the caret, replacing the selection
    InsertText(&'a str),
    /// Delete the selection, or one character before the caret
    DeleteBackward,
    /// Delete the selection, or one character after the caret
    DeleteForward,
    Undo,
    Redo,
    /// Replace the entire value
    Replace(&'a str),
    /// Deliver a synthetic keystroke
    Key(&'a KeyStroke),
}

/// Host collaborator performing primitive edits on a surface
#[async_trait]
pub trait EditApplier<S: EditSurface>: Send + Sync {
    /// Apply one primitive; `false` signals a transient rejection the
    /// caller may retry
    async fn apply(&self, surface: &mut S, op: EditOp<'_>) -> bool;
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    value: String,
    selection: Span,
}

/// In-memory editing surface
#[derive(Debug, Clone)]
pub struct TextBuffer {
    id: String,
    markers: Vec<String>,
    targets: Vec<String>,
    value: String,
    selection: Span,
    focused: bool,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl TextBuffer {
    /// Create an empty buffer with the given identity
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            markers: Vec::new(),
            targets: Vec::new(),
            value: String::new(),
            selection: Span::caret(0),
            focused: false,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Builder: initial value, caret at the end
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self.selection = Span::caret(char_len(&self.value));
        self
    }

    /// Builder: add a class-like marker such as `language-css`
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Builder: add an event target that lives inside this buffer
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.value
    }

    fn clamp(&self, offset: usize) -> usize {
        offset.min(char_len(&self.value))
    }

    fn checkpoint(&mut self) {
        self.undo.push(Snapshot {
            value: self.value.clone(),
            selection: self.selection,
        });
        self.redo.clear();
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.value = snapshot.value;
        self.selection = snapshot.selection;
    }

    fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        let from = byte_offset(&self.value, start);
        let to = byte_offset(&self.value, end);
        self.value.replace_range(from..to, text);
        let caret = start + char_len(text);
        self.selection = Span::caret(caret);
    }

    /// Insert at the caret, replacing any selection
    pub fn insert_text(&mut self, text: &str) {
        self.checkpoint();
        let Span { start, end } = self.selection;
        self.replace_range(start, end, text);
    }

    /// Delete the selection, or one character in `backward` direction
    pub fn delete(&mut self, backward: bool) {
        let Span { start, end } = self.selection;
        let (from, to) = if start != end {
            (start, end)
        } else if backward {
            if start == 0 {
                return;
            }
            (start - 1, start)
        } else {
            if start >= char_len(&self.value) {
                return;
            }
            (start, start + 1)
        };

        self.checkpoint();
        self.replace_range(from, to, "");
    }

    /// Replace the whole value, caret at the end
    pub fn replace_all(&mut self, text: &str) {
        self.checkpoint();
        self.value = text.to_string();
        self.selection = Span::caret(char_len(text));
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.undo.pop() {
            let current = Snapshot {
                value: self.value.clone(),
                selection: self.selection,
            };
            self.redo.push(current);
            self.restore(snapshot);
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.redo.pop() {
            let current = Snapshot {
                value: self.value.clone(),
                selection: self.selection,
            };
            self.undo.push(current);
            self.restore(snapshot);
        }
    }
}

impl EditSurface for TextBuffer {
    fn identity(&self) -> &str {
        &self.id
    }

    fn markers(&self) -> &[String] {
        &self.markers
    }

    fn contains(&self, target: &str) -> bool {
        target == self.id || self.targets.iter().any(|t| t == target)
    }

    fn value(&self) -> String {
        self.value.clone()
    }

    fn selection(&self) -> Span {
        self.selection
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        self.selection = Span::new(start, end);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

/// Applies primitives to a [`TextBuffer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferEditor;

#[async_trait]
impl EditApplier<TextBuffer> for BufferEditor {
    async fn apply(&self, surface: &mut TextBuffer, op: EditOp<'_>) -> bool {
        match op {
            EditOp::InsertText(text) => surface.insert_text(text),
            EditOp::DeleteBackward => surface.delete(true),
            EditOp::DeleteForward => surface.delete(false),
            EditOp::Undo => surface.undo(),
            EditOp::Redo => surface.redo(),
            EditOp::Replace(text) => surface.replace_all(text),
            EditOp::Key(stroke) => {
                tracing::trace!(key = %stroke.key, event = stroke.event.as_str(), "Key delivered");
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_selection() {
        let mut buffer = TextBuffer::new("doc").with_value("hello world");
        buffer.set_selection(6, 11);
        buffer.insert_text("there");

        assert_eq!(buffer.text(), "hello there");
        assert_eq!(buffer.selection(), Span::caret(11));
    }

    #[test]
    fn test_delete_directions() {
        let mut buffer = TextBuffer::new("doc").with_value("abc");
        buffer.delete(true);
        assert_eq!(buffer.text(), "ab");
        assert_eq!(buffer.selection(), Span::caret(2));

        buffer.set_selection(0, 0);
        buffer.delete(false);
        assert_eq!(buffer.text(), "b");
        assert_eq!(buffer.selection(), Span::caret(0));

        buffer.delete(true);
        assert_eq!(buffer.text(), "b");
    }

    #[test]
    fn test_multibyte_offsets() {
        let mut buffer = TextBuffer::new("doc").with_value("héllo");
        assert_eq!(buffer.selection(), Span::caret(5));

        buffer.set_selection(2, 2);
        buffer.delete(true);
        assert_eq!(buffer.text(), "hllo");
        assert_eq!(buffer.selection(), Span::caret(1));
    }

    #[test]
    fn test_undo_redo() {
        let mut buffer = TextBuffer::new("doc");
        buffer.insert_text("a");
        buffer.insert_text("b");
        buffer.undo();
        assert_eq!(buffer.text(), "a");
        buffer.redo();
        assert_eq!(buffer.text(), "ab");

        buffer.undo();
        buffer.insert_text("c");
        buffer.redo();
        assert_eq!(buffer.text(), "ac");
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut buffer = TextBuffer::new("doc").with_value("abc");
        buffer.set_selection(2, 10);
        assert_eq!(buffer.selection(), Span::new(2, 3));
        buffer.set_selection(3, 1);
        assert_eq!(buffer.selection(), Span::new(3, 3));
    }

    #[test]
    fn test_contains_targets() {
        let buffer = TextBuffer::new("editor-css").with_target("css-line-3");
        assert!(buffer.contains("editor-css"));
        assert!(buffer.contains("css-line-3"));
        assert!(!buffer.contains("editor-html"));
    }

    #[tokio::test]
    async fn test_buffer_editor_applies_ops() {
        let mut buffer = TextBuffer::new("doc");
        let editor = BufferEditor;

        assert!(editor.apply(&mut buffer, EditOp::InsertText("Hello")).await);
        assert!(editor.apply(&mut buffer, EditOp::DeleteBackward).await);
        assert_eq!(buffer.text(), "Hell");

        assert!(editor.apply(&mut buffer, EditOp::Replace("new")).await);
        assert_eq!(buffer.text(), "new");
        assert!(editor.apply(&mut buffer, EditOp::Undo).await);
        assert_eq!(buffer.text(), "Hell");
    }
}
