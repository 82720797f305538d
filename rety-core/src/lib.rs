//! # rety - record and replay text edits
//!
//! rety captures edits made to one or more text-editing surfaces as a
//! compact, serializable action log, and replays that log later with
//! realistic typing rhythm. It is built for scripted typing demos:
//! - Normalization of raw surface notifications into canonical actions
//! - Tail-merge compaction (character runs, repeats, caret collapsing,
//!   idle pauses)
//! - Packing and unpacking of the persisted JSON log
//! - Multi-surface routing by editor id
//! - A cooperative, resumable replay scheduler with jittered delays
//!
//! ## Quick Start
//!
//! ```rust
//! use rety_core::prelude::*;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! // Record typing on an in-memory buffer
//! let mut recorder = Recorder::new(
//!     SurfaceRouter::single(TextBuffer::new("doc")),
//!     RecorderConfig::default(),
//! );
//! recorder.start();
//! for c in ["o", "k"] {
//!     recorder.surfaces_mut().active_mut(None)?.insert_text(c);
//!     recorder.handle(&Notification::edit("doc", Some("insertText"), Some(c)));
//! }
//!
//! // Replay it somewhere else
//! let mut replayer = Replayer::new(
//!     SurfaceRouter::single(TextBuffer::new("copy")),
//!     BufferEditor,
//!     ReplayConfig::default().with_delay(Duration::ZERO),
//! );
//! replayer.run_all(recorder.actions()).await?;
//! assert_eq!(replayer.surfaces().active(None)?.text(), "ok");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **action**: the action vocabulary, the packed log codec and the compactor
//! - **recorder**: notifications in, packed log out
//! - **replay**: packed log in, edits applied to surfaces
//! - **router**: named surfaces and the active one
//! - **surface**: the surface and applier contracts, plus an in-memory buffer

pub mod action;
pub mod config;
pub mod error;
pub mod events;
pub mod recorder;
pub mod replay;
pub mod router;
pub mod surface;
pub mod time;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{
        pack, unpack, Action, ActionKind, ActionLog, Compactor, DeleteKind, HistoryOp,
        KeyEventKind, KeyStroke, LogEntry, MergeKind, Span,
    };
    pub use crate::config::{PausePolicy, RecorderConfig, ReplayConfig, RetyConfig};
    pub use crate::error::{Result, RetyError};
    pub use crate::events::{EventEmitter, RecorderEvent, ReplayEvent};
    pub use crate::recorder::{KeyTrigger, Notification, NotificationKind, Recorder};
    pub use crate::replay::{CustomActionHandler, ReplayControl, ReplayState, Replayer};
    pub use crate::router::{SurfaceRouter, DEFAULT_SURFACE};
    pub use crate::surface::{BufferEditor, EditApplier, EditOp, EditSurface, TextBuffer};
    pub use crate::time::{Clock, FixedJitter, JitterSource, ManualClock, RandomJitter, TokioClock};
}
