//! Replaying packed logs against editing surfaces
//!
//! A [`Replayer`] unpacks a log into a queue and drains it one action at a
//! time: switching surfaces when an action names an `editor`, applying the
//! edit through an [`EditApplier`](crate::surface::EditApplier), then waiting
//! the configured delay with ±15% jitter. Recorded pauses follow the
//! configured [`PausePolicy`](crate::config::PausePolicy).
//!
//! Draining is cooperative. [`ReplayControl::pause`] (or
//! [`Replayer::pause`]) takes effect before the next action, and
//! [`Replayer::resume`] carries on from there.
//!
//! # Example
//!
//! ```rust
//! use rety_core::action::ActionLog;
//! use rety_core::config::ReplayConfig;
//! use rety_core::replay::Replayer;
//! use rety_core::router::SurfaceRouter;
//! use rety_core::surface::{BufferEditor, TextBuffer};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rety_core::error::Result<()> {
//! let log = ActionLog::from_json(r#"["Hello", {"type": "deleteContentBackward"}]"#)?;
//!
//! let router = SurfaceRouter::single(TextBuffer::new("doc"));
//! let config = ReplayConfig::default().with_delay(Duration::ZERO);
//! let mut replayer = Replayer::new(router, BufferEditor, config);
//! replayer.run_all(&log).await?;
//!
//! assert_eq!(replayer.surfaces().active(None)?.text(), "Hell");
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod scheduler;

pub use dispatch::CustomActionHandler;
pub use scheduler::{PauseOverride, ReplayControl, ReplayState, Replayer};
