//! Recording sessions
//!
//! A [`Recorder`] owns the surfaces it watches. Hosts feed it
//! [`Notification`]s as events fire; each one is resolved to a surface,
//! normalized into at most one action and merged into the packed log.
//! Subscribers to `actionschange` see every action that made it in.
//!
//! # Example
//!
//! ```rust
//! use rety_core::config::RecorderConfig;
//! use rety_core::recorder::{Notification, Recorder};
//! use rety_core::router::SurfaceRouter;
//! use rety_core::surface::TextBuffer;
//!
//! let router = SurfaceRouter::single(TextBuffer::new("doc"));
//! let mut recorder = Recorder::new(router, RecorderConfig::default());
//! recorder.start();
//!
//! for c in ["h", "i"] {
//!     recorder.surfaces_mut().active_mut(None).unwrap().insert_text(c);
//!     recorder.handle(&Notification::edit("doc", Some("insertText"), Some(c)));
//! }
//!
//! let json = serde_json::to_string(recorder.actions()).unwrap();
//! assert_eq!(json, r#"[{"type":"insertText","text":"hi","split":true}]"#);
//! ```

mod keys;
mod normalizer;

pub use keys::KeyTrigger;
pub use normalizer::{Normalizer, Notification, NotificationKind, SurfaceSnapshot};

use std::sync::Arc;
use std::time::Duration;

use crate::action::{ActionLog, AppendOutcome, Compactor};
use crate::config::RecorderConfig;
use crate::error::Result;
use crate::events::{EventEmitter, RecorderEvent, SubscriptionId};
use crate::router::SurfaceRouter;
use crate::surface::EditSurface;
use crate::time::{Clock, TokioClock};

/// Records edits on one or more surfaces into a packed log
pub struct Recorder<S> {
    router: SurfaceRouter<S>,
    config: RecorderConfig,
    normalizer: Normalizer,
    compactor: Compactor,
    log: ActionLog,
    clock: Arc<dyn Clock>,
    last_append: Option<Duration>,
    recording: bool,
    events: EventEmitter<RecorderEvent>,
}

impl<S: EditSurface> Recorder<S> {
    /// Create a stopped recorder; call [`Recorder::start`] to capture
    pub fn new(router: SurfaceRouter<S>, config: RecorderConfig) -> Self {
        Self {
            normalizer: Normalizer::new(config.keys.clone()),
            compactor: Compactor::new(&config),
            router,
            config,
            log: ActionLog::new(),
            clock: Arc::new(TokioClock::new()),
            last_append: None,
            recording: false,
            events: EventEmitter::new(),
        }
    }

    /// Builder: measure idle gaps with a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Begin (or resume) capturing notifications.
    ///
    /// Time spent stopped never turns into a pause.
    pub fn start(&mut self) {
        self.recording = true;
        self.last_append = None;
        tracing::debug!(surfaces = self.router.count(), "Recording started");
    }

    /// Stop capturing; the log is kept
    pub fn pause(&mut self) {
        self.recording = false;
        tracing::debug!(entries = self.log.len(), "Recording paused");
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Replace the recording options; applies to subsequent notifications
    pub fn set_config(&mut self, config: RecorderConfig) {
        self.normalizer.set_triggers(config.keys.clone());
        self.compactor = Compactor::new(&config);
        self.config = config;
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Discard the log and everything observed so far
    pub fn reset(&mut self) {
        self.log.clear();
        self.normalizer.reset();
        self.last_append = None;
    }

    /// The packed log recorded so far
    pub fn actions(&self) -> &ActionLog {
        &self.log
    }

    /// Take the packed log, leaving an empty one behind
    pub fn take_actions(&mut self) -> ActionLog {
        std::mem::take(&mut self.log)
    }

    /// Continue recording on top of a previously saved log
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        self.log = ActionLog::from_json(json)?;
        self.last_append = None;
        Ok(())
    }

    pub fn surfaces(&self) -> &SurfaceRouter<S> {
        &self.router
    }

    pub fn surfaces_mut(&mut self) -> &mut SurfaceRouter<S> {
        &mut self.router
    }

    /// Subscribe to recorder events by name
    pub fn on<F>(&mut self, name: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&RecorderEvent) + Send + Sync + 'static,
    {
        self.events.on(name, handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    /// Process one notification; returns how the log changed, if it did
    pub fn handle(&mut self, notification: &Notification) -> Option<AppendOutcome> {
        if !self.recording {
            return None;
        }

        let Some(id) = self.router.resolve(&notification.target).map(str::to_string) else {
            tracing::debug!(event_target = %notification.target, "Notification outside every surface");
            return None;
        };

        let (value, selection) = match self.router.get(&id) {
            Ok(surface) => (surface.value(), surface.selection()),
            Err(_) => return None,
        };

        if selection.start > selection.end || selection.end > value.chars().count() {
            tracing::debug!(
                surface = %id,
                start = selection.start,
                end = selection.end,
                "Skipping notification with out-of-range selection"
            );
            return None;
        }

        if self.router.switch_to(&id).is_err() {
            return None;
        }

        let snapshot = SurfaceSnapshot {
            id: &id,
            value: &value,
            selection,
            surface_count: self.router.count(),
        };
        let action = self.normalizer.normalize(&notification.kind, &snapshot)?;

        let now = self.clock.now();
        let idle = self.last_append.map(|last| now.saturating_sub(last));
        let outcome = self.compactor.append(&mut self.log, action.clone(), idle);
        self.last_append = Some(now);

        tracing::trace!(
            action = %action.type_name(),
            merge = ?outcome.merge,
            entries = self.log.len(),
            "Recorded action"
        );

        self.events.emit(&RecorderEvent::ActionsChange {
            action,
            merge: outcome.merge,
        });
        Some(outcome)
    }
}

impl<S> std::fmt::Debug for Recorder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("recording", &self.recording)
            .field("entries", &self.log.len())
            .field("config", &self.config)
            .finish()
    }
}
