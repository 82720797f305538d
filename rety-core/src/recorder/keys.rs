//! Keystroke triggers
//!
//! A trigger names the keys that must be involved in a keystroke for it to
//! be recorded. Configuration may spell one as a combo string (`"Ctrl+S"`)
//! or as a table with an explicit event:
//!
//! ```toml
//! [recorder]
//! keys = [{ keys = "Ctrl+S" }, { keys = ["enter"], event = "keydown" }]
//! ```

use serde::{Deserialize, Serialize};

use crate::action::{KeyEventKind, KeyStroke};

/// Keys that, pressed together on the given event, get recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TriggerRepr", into = "TriggerRepr")]
pub struct KeyTrigger {
    /// Lowercased key names and modifier names (`ctrl`, `shift`, `alt`, `meta`)
    pub keys: Vec<String>,
    pub event: KeyEventKind,
}

impl KeyTrigger {
    /// Parse a `+`-separated combo fired on keyup
    pub fn parse(combo: &str) -> Self {
        Self {
            keys: split_combo(combo),
            event: KeyEventKind::KeyUp,
        }
    }

    /// Builder: fire on a different event
    pub fn on(mut self, event: KeyEventKind) -> Self {
        self.event = event;
        self
    }

    /// Whether `stroke` satisfies this trigger.
    ///
    /// Each key must be either the pressed key or a held modifier.
    pub fn matches(&self, stroke: &KeyStroke) -> bool {
        if self.keys.is_empty() || stroke.event != self.event {
            return false;
        }
        let pressed = stroke.key.to_lowercase();
        self.keys
            .iter()
            .all(|key| *key == pressed || stroke.modifier_held(key))
    }
}

fn split_combo(combo: &str) -> Vec<String> {
    combo
        .split('+')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum KeyList {
    Combo(String),
    Keys(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum TriggerRepr {
    Combo(String),
    Table {
        keys: KeyList,
        #[serde(default)]
        event: KeyEventKind,
    },
}

impl TryFrom<TriggerRepr> for KeyTrigger {
    type Error = String;

    fn try_from(repr: TriggerRepr) -> Result<Self, Self::Error> {
        let (keys, event) = match repr {
            TriggerRepr::Combo(combo) => (split_combo(&combo), KeyEventKind::KeyUp),
            TriggerRepr::Table {
                keys: KeyList::Combo(combo),
                event,
            } => (split_combo(&combo), event),
            TriggerRepr::Table {
                keys: KeyList::Keys(keys),
                event,
            } => (
                keys.iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
                event,
            ),
        };

        if keys.is_empty() {
            return Err("key trigger names no keys".to_string());
        }
        Ok(Self { keys, event })
    }
}

impl From<KeyTrigger> for TriggerRepr {
    fn from(trigger: KeyTrigger) -> Self {
        TriggerRepr::Table {
            keys: KeyList::Keys(trigger.keys),
            event: trigger.event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stroke(event: KeyEventKind, key: &str) -> KeyStroke {
        KeyStroke::new(event, key, "")
    }

    #[test]
    fn test_parse_combo() {
        let trigger = KeyTrigger::parse(" Ctrl + S ");
        assert_eq!(trigger.keys, vec!["ctrl", "s"]);
        assert_eq!(trigger.event, KeyEventKind::KeyUp);
    }

    #[test]
    fn test_matches_with_modifiers() {
        let trigger = KeyTrigger::parse("Ctrl+S");

        let mut save = stroke(KeyEventKind::KeyUp, "S");
        save.ctrl_key = true;
        assert!(trigger.matches(&save));

        let plain = stroke(KeyEventKind::KeyUp, "s");
        assert!(!trigger.matches(&plain));

        let mut on_down = stroke(KeyEventKind::KeyDown, "s");
        on_down.ctrl_key = true;
        assert!(!trigger.matches(&on_down));
    }

    #[test]
    fn test_extra_modifiers_do_not_block() {
        let trigger = KeyTrigger::parse("Enter").on(KeyEventKind::KeyDown);
        let mut enter = stroke(KeyEventKind::KeyDown, "Enter");
        enter.shift_key = true;
        assert!(trigger.matches(&enter));
    }

    #[test]
    fn test_deserialize_forms() {
        let combo: KeyTrigger = serde_json::from_value(json!("Alt+Tab")).unwrap();
        assert_eq!(combo.keys, vec!["alt", "tab"]);

        let table: KeyTrigger =
            serde_json::from_value(json!({"keys": ["Enter"], "event": "keydown"})).unwrap();
        assert_eq!(table.keys, vec!["enter"]);
        assert_eq!(table.event, KeyEventKind::KeyDown);

        let defaulted: KeyTrigger = serde_json::from_value(json!({"keys": "Meta+K"})).unwrap();
        assert_eq!(defaulted.event, KeyEventKind::KeyUp);

        assert!(serde_json::from_value::<KeyTrigger>(json!(" + ")).is_err());
    }

    #[test]
    fn test_serializes_as_table() {
        let value = serde_json::to_value(KeyTrigger::parse("Ctrl+Z")).unwrap();
        assert_eq!(value, json!({"keys": ["ctrl", "z"], "event": "keyup"}));
    }
}
