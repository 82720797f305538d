//! The replay state machine

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::dispatch::{CustomActionHandler, Dispatcher, HandlerMap};
use crate::action::{Action, ActionKind, ActionLog, unpack};
use crate::config::{PausePolicy, ReplayConfig};
use crate::error::{Result, RetyError};
use crate::events::{EventEmitter, ReplayEvent, SubscriptionId};
use crate::router::SurfaceRouter;
use crate::surface::{EditApplier, EditSurface};
use crate::time::{Clock, JitterSource, RandomJitter, TokioClock, jittered};

/// Per-action pause policy, overriding the configured one
pub type PauseOverride = Arc<dyn Fn(&Action) -> PausePolicy + Send + Sync>;

/// Where a replayer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// No queue, or nothing left to play
    Idle,
    /// Draining the queue
    Playing,
    /// Stopped partway with actions still queued, by a pause request or
    /// an aborted drain
    Paused,
}

/// Cloneable handle for pausing a replay from elsewhere, such as a
/// `played` handler or another task
#[derive(Debug, Clone, Default)]
pub struct ReplayControl {
    paused: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
}

impl ReplayControl {
    /// Request a pause; takes effect before the next queued action
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether a drain is currently in progress
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn clear_pause(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

/// Plays a packed log back against routed surfaces
pub struct Replayer<S, A> {
    router: SurfaceRouter<S>,
    applier: A,
    config: ReplayConfig,
    pause_override: Option<PauseOverride>,
    handlers: HandlerMap<S>,
    clock: Arc<dyn Clock>,
    jitter: Box<dyn JitterSource>,
    queue: Option<VecDeque<Action>>,
    played: Vec<Action>,
    control: ReplayControl,
    events: EventEmitter<ReplayEvent>,
}

impl<S: EditSurface, A: EditApplier<S>> Replayer<S, A> {
    pub fn new(router: SurfaceRouter<S>, applier: A, config: ReplayConfig) -> Self {
        Self {
            router,
            applier,
            config,
            pause_override: None,
            handlers: HandlerMap::new(),
            clock: Arc::new(TokioClock::new()),
            jitter: Box::new(RandomJitter::new()),
            queue: None,
            played: Vec::new(),
            control: ReplayControl::default(),
            events: EventEmitter::new(),
        }
    }

    /// Builder: sleep on a different clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: draw delay jitter from a different source
    pub fn with_jitter(mut self, jitter: impl JitterSource + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    /// Builder: decide the pause policy per pause action
    pub fn with_pause_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&Action) -> PausePolicy + Send + Sync + 'static,
    {
        self.pause_override = Some(Arc::new(policy));
        self
    }

    /// Register the handler for a custom action type
    pub fn register_handler(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn CustomActionHandler<S>>,
    ) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Subscribe to replay events by name
    pub fn on<F>(&mut self, name: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&ReplayEvent) + Send + Sync + 'static,
    {
        self.events.on(name, handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }

    pub fn control(&self) -> ReplayControl {
        self.control.clone()
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn state(&self) -> ReplayState {
        if self.control.is_playing() {
            ReplayState::Playing
        } else if self.control.is_paused() && self.queued() > 0 {
            ReplayState::Paused
        } else {
            ReplayState::Idle
        }
    }

    /// Actions played since the last `run_all`
    pub fn played(&self) -> &[Action] {
        &self.played
    }

    /// Number of actions still queued
    pub fn queued(&self) -> usize {
        self.queue.as_ref().map_or(0, VecDeque::len)
    }

    pub fn surfaces(&self) -> &SurfaceRouter<S> {
        &self.router
    }

    pub fn surfaces_mut(&mut self) -> &mut SurfaceRouter<S> {
        &mut self.router
    }

    /// Replace the queue with `actions` and play it from the start
    pub async fn run_all(&mut self, actions: &ActionLog) -> Result<()> {
        self.played.clear();
        self.queue = Some(unpack(actions).into());
        tracing::debug!(queued = self.queued(), "Replay started");
        self.resume().await
    }

    /// Append `actions` to the queue and continue playing
    pub async fn queue_all(&mut self, actions: &ActionLog) -> Result<()> {
        self.queue.get_or_insert_with(VecDeque::new).extend(unpack(actions));
        self.resume().await
    }

    /// Drain the queue until it empties or a pause is requested
    pub async fn resume(&mut self) -> Result<()> {
        if self.queue.is_none() {
            return Err(RetyError::NothingToResume);
        }

        self.control.clear_pause();
        self.control.set_playing(true);
        let result = self.drain().await;
        self.control.set_playing(false);

        match &result {
            Ok(()) if self.control.is_paused() => {
                tracing::debug!(remaining = self.queued(), "Replay paused");
            }
            Ok(()) => tracing::debug!(played = self.played.len(), "Replay finished"),
            Err(e) => {
                // Whatever is left stays resumable
                self.control.pause();
                tracing::warn!(error = %e, remaining = self.queued(), "Replay aborted");
            }
        }
        result
    }

    async fn drain(&mut self) -> Result<()> {
        while self.queued() > 0 {
            if self.control.is_paused() {
                return Ok(());
            }
            self.next().await?;
        }
        Ok(())
    }

    /// Request a pause; the current action finishes first
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Pause and discard the queue and played history
    pub fn stop(&mut self) {
        self.control.pause();
        self.queue = None;
        self.played.clear();
        tracing::debug!("Replay stopped");
    }

    /// Play the next queued action.
    ///
    /// Returns the action played, or `None` once the queue is exhausted.
    /// An action addressed to an unknown editor is consumed and the error
    /// returned; the rest of the queue is left intact.
    pub async fn next(&mut self) -> Result<Option<Action>> {
        loop {
            let Some(action) = self.queue.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };

            if let ActionKind::Pause { delay } = action.kind {
                match self.pause_policy(&action) {
                    PausePolicy::Delay => self.clock.sleep(Duration::from_millis(delay)).await,
                    PausePolicy::Pause => self.control.pause(),
                    PausePolicy::Ignore => {
                        tracing::trace!(delay, "Skipping pause");
                        continue;
                    }
                }
            } else {
                self.dispatch(&action).await?;
                if !self.config.delay.is_zero() {
                    let wait = jittered(self.config.delay, self.jitter.sample());
                    self.clock.sleep(wait).await;
                }
            }

            tracing::trace!(action = %action.type_name(), "Played action");
            self.played.push(action.clone());
            self.events.emit(&ReplayEvent::Played {
                action: action.clone(),
            });
            return Ok(Some(action));
        }
    }

    fn pause_policy(&self, action: &Action) -> PausePolicy {
        match &self.pause_override {
            Some(policy) => policy(action),
            None => self.config.pauses,
        }
    }

    async fn dispatch(&mut self, action: &Action) -> Result<()> {
        if let Some(editor) = &action.editor {
            self.router.switch_to(editor)?;
        }

        let surface = self.router.active_mut(None)?;
        let dispatcher = Dispatcher {
            applier: &self.applier,
            clock: self.clock.as_ref(),
            config: &self.config,
            control: &self.control,
            handlers: &self.handlers,
        };
        dispatcher.run(surface, action).await
    }
}

impl<S, A> std::fmt::Debug for Replayer<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replayer")
            .field("queued", &self.queue.as_ref().map(VecDeque::len))
            .field("played", &self.played.len())
            .field("control", &self.control)
            .field("config", &self.config)
            .finish()
    }
}
