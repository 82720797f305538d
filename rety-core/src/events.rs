//! Per-instance event subscription
//!
//! Recorders and replayers each own an [`EventEmitter`]. Handlers are
//! registered by event name and run synchronously, in registration order,
//! when a matching event is emitted.
//!
//! # Example
//!
//! ```rust
//! use rety_core::events::{EventEmitter, ReplayEvent};
//! use rety_core::action::Action;
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let mut emitter = EventEmitter::new();
//! let sink = seen.clone();
//! emitter.on("played", move |event: &ReplayEvent| {
//!     let ReplayEvent::Played { action } = event;
//!     sink.lock().unwrap().push(action.type_name());
//! });
//!
//! emitter.emit(&ReplayEvent::Played { action: Action::insert_text("a") });
//! assert_eq!(*seen.lock().unwrap(), vec!["insertText".to_string()]);
//! ```

use std::sync::Arc;

use crate::action::{Action, MergeKind};

/// An event that can be dispatched through an [`EventEmitter`]
pub trait Event {
    /// Name handlers subscribe to
    fn name(&self) -> &'static str;
}

/// Emitted by a recorder whenever its log changes
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// A normalized action was merged into the log
    ActionsChange { action: Action, merge: MergeKind },
}

impl Event for RecorderEvent {
    fn name(&self) -> &'static str {
        match self {
            RecorderEvent::ActionsChange { .. } => "actionschange",
        }
    }
}

/// Emitted by a replayer
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// An action finished playing
    Played { action: Action },
}

impl Event for ReplayEvent {
    fn name(&self) -> &'static str {
        match self {
            ReplayEvent::Played { .. } => "played",
        }
    }
}

/// Handle returned by [`EventEmitter::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Publish/subscribe list for one event type
pub struct EventEmitter<E> {
    handlers: Vec<(SubscriptionId, &'static str, Handler<E>)>,
    next_id: u64,
}

impl<E: Event> EventEmitter<E> {
    /// Create an emitter with no handlers
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe `handler` to events called `name`
    pub fn on<F>(&mut self, name: &'static str, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, name, Arc::new(handler)));
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _, _)| *existing != id);
        self.handlers.len() != before
    }

    /// Run every handler subscribed to this event's name
    pub fn emit(&self, event: &E) {
        let name = event.name();
        for (_, subscribed, handler) in &self.handlers {
            if *subscribed == name {
                handler(event);
            }
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
