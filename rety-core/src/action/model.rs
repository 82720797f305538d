//! Canonical action vocabulary
//!
//! An [`Action`] is one recorded edit, selection change, keystroke or pause.
//! Actions are encoded as JSON objects keyed by a `type` string; the
//! conversion lives here so that the packed log codec in
//! [`super::log`] only has to deal with the compaction markers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, RetyError};

/// A caret or selection span in character offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Span {
    /// Selection start (anchor side closest to the document start)
    pub start: usize,
    /// Selection end
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A collapsed span (plain caret)
    pub fn caret(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Whether start and end coincide
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl From<(usize, usize)> for Span {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

impl From<Span> for (usize, usize) {
    fn from(span: Span) -> Self {
        (span.start, span.end)
    }
}

/// Direction a delete primitive removes text in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the start of the value (backspace)
    Backward,
    /// Towards the end of the value (delete)
    Forward,
}

/// Subtype of a `delete*` action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeleteKind {
    ContentBackward,
    ContentForward,
    Content,
    WordBackward,
    WordForward,
    SoftLineBackward,
    SoftLineForward,
    HardLineBackward,
    HardLineForward,
    EntireSoftLine,
    ByCut,
    ByDrag,
    /// Any other `delete…` subtype, stored without the `delete` prefix
    Other(String),
}

impl DeleteKind {
    /// Parse a full type name such as `deleteWordBackward`
    pub fn from_type(type_name: &str) -> Option<Self> {
        let suffix = type_name.strip_prefix("delete")?;
        let kind = match suffix {
            "ContentBackward" => Self::ContentBackward,
            "ContentForward" => Self::ContentForward,
            "Content" => Self::Content,
            "WordBackward" => Self::WordBackward,
            "WordForward" => Self::WordForward,
            "SoftLineBackward" => Self::SoftLineBackward,
            "SoftLineForward" => Self::SoftLineForward,
            "HardLineBackward" => Self::HardLineBackward,
            "HardLineForward" => Self::HardLineForward,
            "EntireSoftLine" => Self::EntireSoftLine,
            "ByCut" => Self::ByCut,
            "ByDrag" => Self::ByDrag,
            other => Self::Other(other.to_string()),
        };
        Some(kind)
    }

    /// Full type name, e.g. `deleteContentBackward`
    pub fn type_name(&self) -> String {
        let suffix = match self {
            Self::ContentBackward => "ContentBackward",
            Self::ContentForward => "ContentForward",
            Self::Content => "Content",
            Self::WordBackward => "WordBackward",
            Self::WordForward => "WordForward",
            Self::SoftLineBackward => "SoftLineBackward",
            Self::SoftLineForward => "SoftLineForward",
            Self::HardLineBackward => "HardLineBackward",
            Self::HardLineForward => "HardLineForward",
            Self::EntireSoftLine => "EntireSoftLine",
            Self::ByCut => "ByCut",
            Self::ByDrag => "ByDrag",
            Self::Other(suffix) => suffix.as_str(),
        };
        format!("delete{suffix}")
    }

    /// Whether one host primitive may remove less than this subtype deletes.
    ///
    /// Such deletes record the caret span they must terminate at.
    pub fn is_multi_unit(&self) -> bool {
        !matches!(
            self,
            Self::ContentBackward | Self::ContentForward | Self::Content | Self::ByCut | Self::ByDrag
        )
    }

    /// Direction of the primitive used to replay this subtype
    pub fn direction(&self) -> Direction {
        if self.type_name().ends_with("Forward") {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Undo/redo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOp {
    Undo,
    Redo,
}

/// Which key event a keystroke was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyEventKind {
    #[serde(rename = "keydown")]
    KeyDown,
    #[serde(rename = "keyup")]
    #[default]
    KeyUp,
}

impl KeyEventKind {
    /// Event name as hosts report it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
        }
    }
}

/// A recorded keystroke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStroke {
    pub event: KeyEventKind,
    pub key: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub meta_key: bool,
}

impl KeyStroke {
    /// A keystroke with no modifiers held
    pub fn new(event: KeyEventKind, key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            event,
            key: key.into(),
            code: code.into(),
            alt_key: false,
            shift_key: false,
            ctrl_key: false,
            meta_key: false,
        }
    }

    /// Whether the named modifier (`alt`, `shift`, `ctrl`, `meta`) is held
    pub fn modifier_held(&self, name: &str) -> bool {
        match name {
            "alt" => self.alt_key,
            "shift" => self.shift_key,
            "ctrl" => self.ctrl_key,
            "meta" => self.meta_key,
            _ => false,
        }
    }
}

/// The payload of an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Insert literal text at the caret, replacing any selection
    InsertText { text: String },

    /// Delete in the given subtype; `after` is the caret span to stop at
    Delete {
        kind: DeleteKind,
        after: Option<Span>,
    },

    /// Undo or redo one step
    History(HistoryOp),

    /// Replace the whole value
    Replace { text: String },

    /// Move the caret or selection
    Caret(Span),

    /// A keystroke matching a configured trigger
    Key(KeyStroke),

    /// Recorded idle time in milliseconds
    Pause { delay: u64 },

    /// Host-defined action, kept opaque
    Custom {
        kind: String,
        fields: Map<String, Value>,
    },
}

/// One canonical action, optionally addressed to a named editor
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,

    /// Editor to activate before applying; only set when the active
    /// surface changed
    pub editor: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, editor: None }
    }

    pub fn insert_text(text: impl Into<String>) -> Self {
        Self::new(ActionKind::InsertText { text: text.into() })
    }

    pub fn delete(kind: DeleteKind, after: Option<Span>) -> Self {
        Self::new(ActionKind::Delete { kind, after })
    }

    pub fn replace(text: impl Into<String>) -> Self {
        Self::new(ActionKind::Replace { text: text.into() })
    }

    pub fn caret(start: usize, end: usize) -> Self {
        Self::new(ActionKind::Caret(Span::new(start, end)))
    }

    pub fn key(stroke: KeyStroke) -> Self {
        Self::new(ActionKind::Key(stroke))
    }

    pub fn pause(delay: u64) -> Self {
        Self::new(ActionKind::Pause { delay })
    }

    pub fn custom(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self::new(ActionKind::Custom {
            kind: kind.into(),
            fields,
        })
    }

    /// Address this action to an editor
    pub fn with_editor(mut self, editor: impl Into<String>) -> Self {
        self.editor = Some(editor.into());
        self
    }

    /// The `type` string this action serializes with
    pub fn type_name(&self) -> String {
        match &self.kind {
            ActionKind::InsertText { .. } => "insertText".to_string(),
            ActionKind::Delete { kind, .. } => kind.type_name(),
            ActionKind::History(HistoryOp::Undo) => "historyUndo".to_string(),
            ActionKind::History(HistoryOp::Redo) => "historyRedo".to_string(),
            ActionKind::Replace { .. } => "replace".to_string(),
            ActionKind::Caret(_) => "caret".to_string(),
            ActionKind::Key(_) => "key".to_string(),
            ActionKind::Pause { .. } => "pause".to_string(),
            ActionKind::Custom { kind, .. } => kind.clone(),
        }
    }

    /// Inserted text, if this is an `insertText` action
    pub fn inserted_text(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::InsertText { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self.kind, ActionKind::Pause { .. })
    }

    pub fn is_caret(&self) -> bool {
        matches!(self.kind, ActionKind::Caret(_))
    }

    /// Encode as a JSON object with a `type` field
    pub fn to_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.type_name()));

        match &self.kind {
            ActionKind::InsertText { text } | ActionKind::Replace { text } => {
                map.insert("text".to_string(), Value::String(text.clone()));
            }
            ActionKind::Delete { after, .. } => {
                if let Some(after) = after {
                    map.insert(
                        "after".to_string(),
                        Value::Array(vec![after.start.into(), after.end.into()]),
                    );
                }
            }
            ActionKind::History(_) => {}
            ActionKind::Caret(span) => {
                map.insert("start".to_string(), span.start.into());
                map.insert("end".to_string(), span.end.into());
            }
            ActionKind::Key(stroke) => {
                if let Ok(Value::Object(fields)) = serde_json::to_value(stroke) {
                    map.extend(fields);
                }
            }
            ActionKind::Pause { delay } => {
                map.insert("delay".to_string(), (*delay).into());
            }
            ActionKind::Custom { fields, .. } => {
                for (key, value) in fields {
                    if key != "type" && key != "editor" {
                        map.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        if let Some(editor) = &self.editor {
            map.insert("editor".to_string(), Value::String(editor.clone()));
        }

        map
    }

    /// Decode from a JSON object; compaction markers must already be removed
    pub fn from_object(mut map: Map<String, Value>) -> Result<Self> {
        let type_name = match map.remove("type") {
            Some(Value::String(t)) => t,
            _ => return Err(RetyError::malformed("action is missing a string `type`")),
        };

        let editor = match map.remove("editor") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                return Err(RetyError::malformed(format!(
                    "`editor` must be a string, got {other}"
                )));
            }
        };

        let kind = match type_name.as_str() {
            // Older logs stored pasted text under its input type
            "insertText" | "insertFromPaste" => ActionKind::InsertText {
                text: take_string(&mut map, "text")?,
            },
            "replace" => ActionKind::Replace {
                text: take_optional_string(&mut map, "text")?.unwrap_or_default(),
            },
            "historyUndo" => ActionKind::History(HistoryOp::Undo),
            "historyRedo" => ActionKind::History(HistoryOp::Redo),
            "caret" => ActionKind::Caret(Span::new(
                take_usize(&mut map, "start")?,
                take_usize(&mut map, "end")?,
            )),
            "pause" => ActionKind::Pause {
                delay: take_u64(&mut map, "delay")?,
            },
            "key" => {
                let stroke: KeyStroke = serde_json::from_value(Value::Object(map))
                    .map_err(|e| RetyError::malformed(format!("invalid key action: {e}")))?;
                ActionKind::Key(stroke)
            }
            other => match DeleteKind::from_type(other) {
                Some(kind) => ActionKind::Delete {
                    kind,
                    after: take_span(&mut map, "after")?,
                },
                None => ActionKind::Custom {
                    kind: type_name.clone(),
                    fields: map,
                },
            },
        };

        Ok(Self { kind, editor })
    }
}

fn take_string(map: &mut Map<String, Value>, field: &str) -> Result<String> {
    take_optional_string(map, field)?
        .ok_or_else(|| RetyError::malformed(format!("missing string field `{field}`")))
}

fn take_optional_string(map: &mut Map<String, Value>, field: &str) -> Result<Option<String>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(RetyError::malformed(format!(
            "`{field}` must be a string, got {other}"
        ))),
    }
}

fn take_u64(map: &mut Map<String, Value>, field: &str) -> Result<u64> {
    map.remove(field)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RetyError::malformed(format!("missing non-negative integer `{field}`")))
}

fn take_usize(map: &mut Map<String, Value>, field: &str) -> Result<usize> {
    let value = take_u64(map, field)?;
    usize::try_from(value).map_err(|_| RetyError::malformed(format!("`{field}` out of range")))
}

fn take_span(map: &mut Map<String, Value>, field: &str) -> Result<Option<Span>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value::<Span>(value)
            .map(Some)
            .map_err(|e| RetyError::malformed(format!("invalid `{field}` span: {e}"))),
    }
}
