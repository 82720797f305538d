//! Applying one action to the active surface

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::scheduler::ReplayControl;
use crate::action::{Action, ActionKind, Direction, HistoryOp, Span};
use crate::config::ReplayConfig;
use crate::error::Result;
use crate::surface::{EditApplier, EditOp, EditSurface};
use crate::time::Clock;

/// Replays actions of a host-defined type
#[async_trait]
pub trait CustomActionHandler<S: EditSurface>: Send + Sync {
    async fn handle(&self, surface: &mut S, action: &Action) -> Result<()>;
}

pub(crate) type HandlerMap<S> = HashMap<String, Arc<dyn CustomActionHandler<S>>>;

/// Borrowed view of a replayer's collaborators for a single dispatch
pub(crate) struct Dispatcher<'a, S, A> {
    pub applier: &'a A,
    pub clock: &'a dyn Clock,
    pub config: &'a ReplayConfig,
    pub control: &'a ReplayControl,
    pub handlers: &'a HandlerMap<S>,
}

impl<S: EditSurface, A: EditApplier<S>> Dispatcher<'_, S, A> {
    pub async fn run(&self, surface: &mut S, action: &Action) -> Result<()> {
        if !surface.is_focused() {
            surface.focus();
        }

        match &action.kind {
            ActionKind::Caret(span) => self.move_caret(surface, *span).await,
            ActionKind::InsertText { text } => self.apply(surface, EditOp::InsertText(text)).await,
            ActionKind::Replace { text } => self.apply(surface, EditOp::Replace(text)).await,
            ActionKind::History(HistoryOp::Undo) => self.apply(surface, EditOp::Undo).await,
            ActionKind::History(HistoryOp::Redo) => self.apply(surface, EditOp::Redo).await,
            ActionKind::Key(stroke) => self.apply(surface, EditOp::Key(stroke)).await,
            ActionKind::Delete { kind, after } => {
                let op = match kind.direction() {
                    Direction::Backward => EditOp::DeleteBackward,
                    Direction::Forward => EditOp::DeleteForward,
                };
                self.delete(surface, op, *after).await;
            }
            ActionKind::Pause { .. } => {}
            ActionKind::Custom { kind, .. } => match self.handlers.get(kind) {
                Some(handler) => handler.handle(surface, action).await?,
                None => tracing::debug!(action = %kind, "No handler for custom action, skipping"),
            },
        }

        Ok(())
    }

    /// Apply a primitive, retrying once after the configured backoff
    async fn apply(&self, surface: &mut S, op: EditOp<'_>) {
        if self.applier.apply(surface, op).await {
            return;
        }

        tracing::warn!(?op, "Edit primitive rejected, retrying");
        self.clock.sleep(self.config.retry_backoff).await;

        if !self.applier.apply(surface, op).await {
            tracing::warn!(?op, "Edit primitive rejected twice, skipping");
        }
    }

    /// Delete one unit, then keep going until the caret reaches `after`.
    ///
    /// Bounded by the value length, and stops early once a delete stops
    /// shortening the value.
    async fn delete(&self, surface: &mut S, op: EditOp<'_>, after: Option<Span>) {
        self.apply(surface, op).await;

        let Some(after) = after else {
            return;
        };

        let bound = surface.value().chars().count();
        let mut steps = 0;
        while surface.selection().start != after.start && steps < bound {
            let before = surface.value().chars().count();
            self.apply(surface, op).await;
            steps += 1;
            if surface.value().chars().count() >= before {
                break;
            }
        }

        if surface.selection().start != after.start {
            tracing::debug!(
                target_start = after.start,
                caret = surface.selection().start,
                "Delete stopped short of its recorded caret"
            );
        }
    }

    /// Move the selection, sweeping across ranges when animation is on
    async fn move_caret(&self, surface: &mut S, span: Span) {
        if self.config.animated_selection && span.end > span.start {
            surface.set_selection(span.start, span.start);
            for end in span.start + 1..span.end {
                self.clock.sleep(self.config.selection_step).await;
                if self.control.is_paused() {
                    break;
                }
                surface.set_selection(span.start, end);
            }
            if !self.control.is_paused() {
                self.clock.sleep(self.config.selection_step).await;
            }
        }

        surface.set_selection(span.start, span.end);
    }
}
