//! Packed action log encoding
//!
//! A packed log is a JSON array. Each element is either a bare string
//! (an `insertText` with nothing else attached) or an action object that may
//! carry the compaction markers `repeat`, `split` and `position`. Those
//! markers exist only here; [`Action`] never sees them.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::model::{Action, ActionKind};
use crate::error::{Result, RetyError};

/// Largest `repeat` a single entry may carry
pub const MAX_REPEAT: u32 = 10_000;

/// One element of a packed log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub action: Action,

    /// Number of consecutive occurrences, at least 1
    pub repeat: u32,

    /// Marks an `insertText` built from single-character insertions
    pub split: bool,
}

impl LogEntry {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            repeat: 1,
            split: false,
        }
    }

    /// Whether this entry serializes as a bare string
    pub fn is_shorthand(&self) -> bool {
        matches!(self.action.kind, ActionKind::InsertText { .. })
            && self.action.editor.is_none()
            && self.repeat <= 1
            && !self.split
    }

    /// Expand into the actions this entry stands for
    pub fn expand(&self) -> Vec<Action> {
        if self.split {
            if let ActionKind::InsertText { text } = &self.action.kind {
                return text
                    .chars()
                    .enumerate()
                    .map(|(i, c)| Action {
                        kind: ActionKind::InsertText {
                            text: c.to_string(),
                        },
                        editor: if i == 0 { self.action.editor.clone() } else { None },
                    })
                    .collect();
            }
        }

        vec![self.action.clone(); self.repeat.max(1) as usize]
    }

    /// Number of expanded actions without allocating them
    pub fn expanded_len(&self) -> usize {
        match (&self.action.kind, self.split) {
            (ActionKind::InsertText { text }, true) => text.chars().count(),
            _ => self.repeat.max(1) as usize,
        }
    }

    /// Encode as the JSON value stored in a packed log
    pub fn to_value(&self) -> Value {
        if self.is_shorthand() {
            if let ActionKind::InsertText { text } = &self.action.kind {
                return Value::String(text.clone());
            }
        }

        let collapsed = matches!(&self.action.kind, ActionKind::Caret(span) if span.is_collapsed());
        let mut map = Map::new();
        for (key, value) in self.action.to_object() {
            match key.as_str() {
                "start" if collapsed => {
                    map.insert("position".to_string(), value);
                }
                "end" if collapsed => {}
                _ => {
                    map.insert(key, value);
                }
            }
        }

        if self.repeat > 1 {
            map.insert("repeat".to_string(), self.repeat.into());
        }
        if self.split {
            map.insert("split".to_string(), Value::Bool(true));
        }

        Value::Object(map)
    }

    /// Decode one packed log element
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::String(text) => return Ok(Self::new(Action::insert_text(text))),
            Value::Object(map) => map,
            other => {
                return Err(RetyError::malformed(format!(
                    "log entry must be a string or an object, got {other}"
                )));
            }
        };

        let repeat = match map.remove("repeat") {
            None | Some(Value::Null) => 1,
            Some(value) => value
                .as_u64()
                .filter(|n| (1..=u64::from(MAX_REPEAT)).contains(n))
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| RetyError::malformed(format!("invalid `repeat`: {value}")))?,
        };

        let split = match map.remove("split") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                return Err(RetyError::malformed(format!("invalid `split`: {other}")));
            }
        };

        // `position` is caret shorthand; other types keep it as a field
        if map.get("type").and_then(Value::as_str) == Some("caret") {
            if let Some(position) = map.remove("position") {
                map.entry("start").or_insert_with(|| position.clone());
                map.entry("end").or_insert(position);
            }
        }

        let action = Action::from_object(map)?;
        let split = split && matches!(action.kind, ActionKind::InsertText { .. });
        if split && repeat > 1 {
            return Err(RetyError::malformed(
                "`repeat` cannot be combined with a `split` run",
            ));
        }

        Ok(Self {
            action,
            repeat,
            split,
        })
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        LogEntry::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// A packed, serialization-ready action log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from entries as-is, without merging
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a packed log from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(LogEntry::from_value)
                .collect::<Result<Vec<_>>>()
                .map(Self::from_entries),
            other => Err(RetyError::malformed(format!(
                "action log must be an array, got {other}"
            ))),
        }
    }

    /// Parse a packed log from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| RetyError::malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Encode as a JSON array
    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(LogEntry::to_value).collect())
    }

    /// Encode as pretty-printed JSON text
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of actions the log expands to
    pub fn expanded_len(&self) -> usize {
        self.entries.iter().map(LogEntry::expanded_len).sum()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut LogEntry> {
        self.entries.last_mut()
    }

    pub(crate) fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<LogEntry> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

/// Wraps already-expanded actions one entry each, without merging
impl FromIterator<Action> for ActionLog {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().map(LogEntry::new).collect())
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
