//! Action model and log encodings
//!
//! Recorded edits live in two shapes:
//!
//! - the **expanded** form, a plain `Vec<Action>` with one entry per replay
//!   step, and
//! - the **packed** form, an [`ActionLog`] whose entries may stand for
//!   several steps (`repeat`, `split`) and which serializes to the compact
//!   JSON array that gets persisted.
//!
//! # Example
//!
//! ```rust
//! use rety_core::action::{pack, unpack, Action, ActionLog};
//!
//! let log = pack(vec![
//!     Action::insert_text("h"),
//!     Action::insert_text("i"),
//!     Action::caret(1, 1),
//! ]);
//!
//! let json = serde_json::to_string(&log).unwrap();
//! assert_eq!(
//!     json,
//!     r#"[{"type":"insertText","text":"hi","split":true},{"type":"caret","position":1}]"#
//! );
//!
//! let restored = ActionLog::from_json(&json).unwrap();
//! assert_eq!(unpack(&restored).len(), 3);
//! ```

mod compact;
mod log;
mod model;

pub use compact::{pack, unpack, AppendOutcome, Compactor, MergeKind};
pub use log::{ActionLog, LogEntry, MAX_REPEAT};
pub use model::{
    Action, ActionKind, DeleteKind, Direction, HistoryOp, KeyEventKind, KeyStroke, Span,
};
