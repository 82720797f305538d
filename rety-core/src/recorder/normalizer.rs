//! Turning surface notifications into canonical actions
//!
//! Hosts report what happened on a surface as a [`Notification`]. The
//! [`Normalizer`] compares it with what it saw last and produces at most
//! one [`Action`] per notification.

use serde_json::{Map, Value};

use super::keys::KeyTrigger;
use crate::action::{Action, ActionKind, DeleteKind, HistoryOp, KeyStroke, Span};

/// What a host observed on a surface
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    /// The value changed; `input_kind` is the host's input type such as
    /// `insertText` or `deleteWordBackward`
    Edit {
        input_kind: Option<String>,
        data: Option<String>,
    },
    /// The selection may have moved
    Selection,
    /// A keystroke
    Key(KeyStroke),
    /// Text placed on the clipboard for a later paste
    Paste { text: String },
}

/// A notification addressed to an event target
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Host id of the element the event fired on
    pub target: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn edit(
        target: impl Into<String>,
        input_kind: Option<&str>,
        data: Option<&str>,
    ) -> Self {
        Self {
            target: target.into(),
            kind: NotificationKind::Edit {
                input_kind: input_kind.map(str::to_string),
                data: data.map(str::to_string),
            },
        }
    }

    pub fn selection(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: NotificationKind::Selection,
        }
    }

    pub fn key(target: impl Into<String>, stroke: KeyStroke) -> Self {
        Self {
            target: target.into(),
            kind: NotificationKind::Key(stroke),
        }
    }

    pub fn paste(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: NotificationKind::Paste { text: text.into() },
        }
    }
}

/// State of the surface a notification resolved to, read after the event
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSnapshot<'a> {
    pub id: &'a str,
    pub value: &'a str,
    pub selection: Span,
    /// How many surfaces the recorder routes between
    pub surface_count: usize,
}

/// Per-session normalization state
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    triggers: Vec<KeyTrigger>,
    last_selection: Option<Span>,
    recorded_surface: Option<String>,
    clipboard: Option<String>,
}

impl Normalizer {
    pub fn new(triggers: Vec<KeyTrigger>) -> Self {
        Self {
            triggers,
            ..Self::default()
        }
    }

    /// Forget everything observed so far
    pub fn reset(&mut self) {
        self.last_selection = None;
        self.recorded_surface = None;
        self.clipboard = None;
    }

    pub fn set_triggers(&mut self, triggers: Vec<KeyTrigger>) {
        self.triggers = triggers;
    }

    /// Produce the action for `kind`, if it warrants one.
    ///
    /// The first action recorded on a different surface than the previous
    /// one carries that surface's id in `editor`.
    pub fn normalize(
        &mut self,
        kind: &NotificationKind,
        surface: &SurfaceSnapshot<'_>,
    ) -> Option<Action> {
        let switched = surface.surface_count > 1
            && self.recorded_surface.as_deref() != Some(surface.id);

        let action = match kind {
            NotificationKind::Edit { input_kind, data } => {
                self.edit(input_kind.as_deref(), data.as_deref(), surface)
            }
            NotificationKind::Selection => {
                let moved = self.last_selection != Some(surface.selection);
                (moved || switched)
                    .then(|| Action::caret(surface.selection.start, surface.selection.end))
            }
            NotificationKind::Key(stroke) => self
                .triggers
                .iter()
                .any(|trigger| trigger.matches(stroke))
                .then(|| Action::key(stroke.clone())),
            NotificationKind::Paste { text } => {
                self.clipboard = Some(text.clone());
                None
            }
        };

        self.last_selection = Some(surface.selection);

        let mut action = action?;
        if switched {
            action.editor = Some(surface.id.to_string());
        }
        self.recorded_surface = Some(surface.id.to_string());
        Some(action)
    }

    fn edit(
        &self,
        input_kind: Option<&str>,
        data: Option<&str>,
        surface: &SurfaceSnapshot<'_>,
    ) -> Option<Action> {
        let Some(input_kind) = input_kind else {
            return Some(Action::replace(surface.value));
        };

        match input_kind {
            "insertFromPaste" | "insertFromDrop" => match data {
                Some(text) if !text.is_empty() => Some(Action::insert_text(text)),
                _ => {
                    let pasted = self.clipboard.as_deref().filter(|t| !t.is_empty());
                    if pasted.is_none() {
                        tracing::debug!(input_kind, "Paste with no known clipboard text");
                    }
                    pasted.map(Action::insert_text)
                }
            },
            "insertLineBreak" | "insertParagraph" => {
                let from = self.last_selection.map_or(0, |span| span.end);
                let to = surface.selection.end;
                let inserted: String = if to > from {
                    surface.value.chars().skip(from).take(to - from).collect()
                } else {
                    String::new()
                };
                if inserted.is_empty() {
                    Some(Action::insert_text("\n"))
                } else {
                    Some(Action::insert_text(inserted))
                }
            }
            "historyUndo" => Some(Action::new(ActionKind::History(HistoryOp::Undo))),
            "historyRedo" => Some(Action::new(ActionKind::History(HistoryOp::Redo))),
            other if other.starts_with("insert") => data
                .filter(|text| !text.is_empty())
                .map(Action::insert_text),
            other => match DeleteKind::from_type(other) {
                Some(kind) => {
                    let after = kind.is_multi_unit().then_some(surface.selection);
                    Some(Action::delete(kind, after))
                }
                None => {
                    let mut fields = Map::new();
                    if let Some(text) = data {
                        fields.insert("text".to_string(), Value::String(text.to_string()));
                    }
                    Some(Action::custom(other, fields))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::KeyEventKind;

    fn snapshot<'a>(id: &'a str, value: &'a str, start: usize, end: usize) -> SurfaceSnapshot<'a> {
        SurfaceSnapshot {
            id,
            value,
            selection: Span::new(start, end),
            surface_count: 1,
        }
    }

    fn edit(input_kind: Option<&str>, data: Option<&str>) -> NotificationKind {
        NotificationKind::Edit {
            input_kind: input_kind.map(str::to_string),
            data: data.map(str::to_string),
        }
    }

    #[test]
    fn test_insert_text() {
        let mut normalizer = Normalizer::default();
        let action = normalizer.normalize(
            &edit(Some("insertText"), Some("a")),
            &snapshot("default", "a", 1, 1),
        );
        assert_eq!(action, Some(Action::insert_text("a")));

        let empty = normalizer.normalize(
            &edit(Some("insertText"), Some("")),
            &snapshot("default", "a", 1, 1),
        );
        assert_eq!(empty, None);
    }

    #[test]
    fn test_missing_kind_replaces_value() {
        let mut normalizer = Normalizer::default();
        let action = normalizer.normalize(&edit(None, None), &snapshot("default", "whole", 5, 5));
        assert_eq!(action, Some(Action::replace("whole")));
    }

    #[test]
    fn test_line_break_reads_inserted_range() {
        let mut normalizer = Normalizer::default();
        normalizer.normalize(&NotificationKind::Selection, &snapshot("default", "ab", 2, 2));

        let action = normalizer.normalize(
            &edit(Some("insertLineBreak"), None),
            &snapshot("default", "ab\n  ", 5, 5),
        );
        assert_eq!(action, Some(Action::insert_text("\n  ")));
    }

    #[test]
    fn test_line_break_falls_back_to_newline() {
        let mut normalizer = Normalizer::default();
        normalizer.normalize(&NotificationKind::Selection, &snapshot("default", "ab", 2, 2));

        let action = normalizer.normalize(
            &edit(Some("insertParagraph"), None),
            &snapshot("default", "ab\n", 2, 2),
        );
        assert_eq!(action, Some(Action::insert_text("\n")));
    }

    #[test]
    fn test_paste_uses_clipboard() {
        let mut normalizer = Normalizer::default();
        let none = normalizer.normalize(
            &edit(Some("insertFromPaste"), None),
            &snapshot("default", "x", 1, 1),
        );
        assert_eq!(none, None);

        normalizer.normalize(
            &NotificationKind::Paste {
                text: "copied".to_string(),
            },
            &snapshot("default", "x", 1, 1),
        );
        let pasted = normalizer.normalize(
            &edit(Some("insertFromPaste"), None),
            &snapshot("default", "xcopied", 7, 7),
        );
        assert_eq!(pasted, Some(Action::insert_text("copied")));
    }

    #[test]
    fn test_delete_records_after_for_multi_unit() {
        let mut normalizer = Normalizer::default();
        let word = normalizer.normalize(
            &edit(Some("deleteWordBackward"), None),
            &snapshot("default", "foo ", 4, 4),
        );
        assert_eq!(
            word,
            Some(Action::delete(DeleteKind::WordBackward, Some(Span::new(4, 4))))
        );

        let single = normalizer.normalize(
            &edit(Some("deleteContentBackward"), None),
            &snapshot("default", "foo", 3, 3),
        );
        assert_eq!(single, Some(Action::delete(DeleteKind::ContentBackward, None)));
    }

    #[test]
    fn test_history_and_unknown_kinds() {
        let mut normalizer = Normalizer::default();
        let undo = normalizer.normalize(&edit(Some("historyUndo"), None), &snapshot("d", "", 0, 0));
        assert_eq!(undo.map(|a| a.kind), Some(ActionKind::History(HistoryOp::Undo)));

        let custom = normalizer
            .normalize(&edit(Some("formatBold"), Some("b")), &snapshot("d", "", 0, 0))
            .unwrap();
        assert_eq!(custom.type_name(), "formatBold");
    }

    #[test]
    fn test_caret_only_on_change() {
        let mut normalizer = Normalizer::default();
        let first = normalizer.normalize(&NotificationKind::Selection, &snapshot("d", "abc", 1, 1));
        assert_eq!(first, Some(Action::caret(1, 1)));

        let same = normalizer.normalize(&NotificationKind::Selection, &snapshot("d", "abc", 1, 1));
        assert_eq!(same, None);

        let range = normalizer.normalize(&NotificationKind::Selection, &snapshot("d", "abc", 0, 3));
        assert_eq!(range, Some(Action::caret(0, 3)));
    }

    #[test]
    fn test_keys_need_matching_trigger() {
        let mut normalizer = Normalizer::new(vec![KeyTrigger::parse("Ctrl+S")]);
        let mut save = KeyStroke::new(KeyEventKind::KeyUp, "s", "KeyS");

        let ignored = normalizer.normalize(&NotificationKind::Key(save.clone()), &snapshot("d", "", 0, 0));
        assert_eq!(ignored, None);

        save.ctrl_key = true;
        let recorded = normalizer.normalize(&NotificationKind::Key(save.clone()), &snapshot("d", "", 0, 0));
        assert_eq!(recorded, Some(Action::key(save)));
    }

    #[test]
    fn test_switch_marks_editor_once() {
        let mut normalizer = Normalizer::default();
        let mut css = snapshot("css", "a", 1, 1);
        css.surface_count = 2;
        let mut html = snapshot("html", "", 0, 0);
        html.surface_count = 2;

        let first = normalizer
            .normalize(&edit(Some("insertText"), Some("a")), &css)
            .unwrap();
        assert_eq!(first.editor.as_deref(), Some("css"));

        let second = normalizer
            .normalize(&edit(Some("insertText"), Some("b")), &css)
            .unwrap();
        assert_eq!(second.editor, None);

        // Same selection as last seen, but the surface changed
        html.selection = Span::new(1, 1);
        let caret = normalizer.normalize(&NotificationKind::Selection, &html).unwrap();
        assert_eq!(caret, Action::caret(1, 1).with_editor("html"));
    }

    #[test]
    fn test_single_surface_never_marks_editor() {
        let mut normalizer = Normalizer::default();
        let action = normalizer
            .normalize(&edit(Some("insertText"), Some("a")), &snapshot("default", "a", 1, 1))
            .unwrap();
        assert_eq!(action.editor, None);
    }
}
