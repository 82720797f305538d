//! Tail-merge compaction and its inverse
//!
//! [`Compactor::append`] looks only at the last entry of the log, so every
//! call is O(1). The rules, in order:
//!
//! 1. an idle gap above the threshold first records a `pause`
//! 2. single-character `insertText` actions join into a `split` run
//! 3. an action equal to the tail bumps the tail's `repeat`, up to
//!    [`MAX_REPEAT`]
//! 4. a plain caret move replaces a caret tail, inheriting its `editor`
//! 5. anything else is appended
//!
//! [`unpack`] expands `repeat` and `split` back into one action per step.

use std::time::Duration;

use super::log::{ActionLog, LogEntry, MAX_REPEAT};
use super::model::{Action, ActionKind};
use crate::config::RecorderConfig;

/// How a candidate ended up in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Pushed as a new tail entry
    Appended,
    /// Joined the tail's character run
    ExtendedRun,
    /// Incremented the tail's repeat count
    Repeated,
    /// Replaced a caret tail
    ReplacedCaret,
    /// Added its delay to a pause tail
    ExtendedPause,
}

/// Result of a single append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub merge: MergeKind,

    /// Delay of the idle pause recorded ahead of the action, in ms
    pub pause: Option<u64>,
}

/// Applies the merge rules to the tail of a log
#[derive(Debug, Clone)]
pub struct Compactor {
    pause_threshold: Option<Duration>,
    pause_cap: Option<Duration>,
    record_pauses: bool,
    preserve_caret_changes: bool,
}

impl Compactor {
    /// Create a compactor from recording options
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            pause_threshold: config.effective_pause_threshold(),
            pause_cap: config.pause_cap,
            record_pauses: config.record_pauses,
            preserve_caret_changes: config.preserve_caret_changes,
        }
    }

    /// Rules for packing an already-expanded log: no idle pauses and no
    /// caret replacement.
    pub fn packing() -> Self {
        Self {
            pause_threshold: None,
            pause_cap: None,
            record_pauses: false,
            preserve_caret_changes: true,
        }
    }

    /// Merge `candidate` into the tail of `log`.
    ///
    /// `idle` is the real time elapsed since the previous append, or `None`
    /// for the first action of a session.
    pub fn append(
        &self,
        log: &mut ActionLog,
        candidate: Action,
        idle: Option<Duration>,
    ) -> AppendOutcome {
        let pause = idle.and_then(|gap| self.idle_pause(gap));
        if let Some(delay) = pause {
            self.push_pause(log, delay);
        }

        let recorded_pause = match candidate.kind {
            ActionKind::Pause { delay } => Some(delay),
            _ => None,
        };
        let merge = match recorded_pause {
            Some(delay) => self.push_pause(log, delay),
            None => self.merge(log, candidate),
        };

        AppendOutcome { merge, pause }
    }

    /// Pause delay to record for an idle gap, if any
    fn idle_pause(&self, gap: Duration) -> Option<u64> {
        if !self.record_pauses {
            return None;
        }
        let threshold = self.pause_threshold?;
        if gap <= threshold {
            return None;
        }

        let delay = match self.pause_cap {
            Some(cap) => gap.min(cap),
            None => gap,
        };
        Some(delay.as_millis() as u64)
    }

    fn cap_delay(&self, delay: u64) -> u64 {
        match self.pause_cap {
            Some(cap) => delay.min(cap.as_millis() as u64),
            None => delay,
        }
    }

    /// Pauses never sit next to each other: a pause tail absorbs the delay
    fn push_pause(&self, log: &mut ActionLog, delay: u64) -> MergeKind {
        if let Some(tail) = log.last_mut() {
            if let ActionKind::Pause { delay: existing } = &mut tail.action.kind {
                *existing = self.cap_delay(existing.saturating_add(delay));
                return MergeKind::ExtendedPause;
            }
        }

        log.push(LogEntry::new(Action::pause(delay)));
        MergeKind::Appended
    }

    fn merge(&self, log: &mut ActionLog, mut candidate: Action) -> MergeKind {
        if let Some(tail) = log.last_mut() {
            if is_single_char_insert(&candidate) && is_char_run(tail) {
                if let (ActionKind::InsertText { text }, Some(addition)) =
                    (&mut tail.action.kind, candidate.inserted_text())
                {
                    text.push_str(addition);
                    tail.split = true;
                    return MergeKind::ExtendedRun;
                }
            }

            let repeatable = !matches!(candidate.kind, ActionKind::InsertText { .. });
            if repeatable && tail.action == candidate {
                if tail.repeat < MAX_REPEAT {
                    tail.repeat += 1;
                    return MergeKind::Repeated;
                }
                log.push(LogEntry::new(candidate));
                return MergeKind::Appended;
            }
        }

        let replaces_caret = !self.preserve_caret_changes
            && candidate.is_caret()
            && candidate.editor.is_none()
            && log.last().is_some_and(|tail| tail.action.is_caret());

        if replaces_caret {
            if let Some(removed) = log.pop() {
                candidate.editor = removed.action.editor;
            }
            log.push(LogEntry::new(candidate));
            return MergeKind::ReplacedCaret;
        }

        log.push(LogEntry::new(candidate));
        MergeKind::Appended
    }
}

fn is_single_char_insert(action: &Action) -> bool {
    action.editor.is_none()
        && action
            .inserted_text()
            .is_some_and(|text| text.chars().count() == 1)
}

fn is_char_run(entry: &LogEntry) -> bool {
    entry.action.editor.is_none()
        && entry.repeat == 1
        && entry
            .action
            .inserted_text()
            .is_some_and(|text| entry.split || text.chars().count() == 1)
}

/// Compact an expanded log into its packed form
pub fn pack<I>(actions: I) -> ActionLog
where
    I: IntoIterator<Item = Action>,
{
    let compactor = Compactor::packing();
    let mut log = ActionLog::new();
    for action in actions {
        compactor.append(&mut log, action, None);
    }
    log
}

/// Expand a packed log into one action per replay step
pub fn unpack(log: &ActionLog) -> Vec<Action> {
    let mut actions = Vec::with_capacity(log.expanded_len());
    for entry in log {
        actions.extend(entry.expand());
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::model::{DeleteKind, Span};

    fn compactor() -> Compactor {
        Compactor::new(&RecorderConfig::default())
    }

    fn append_all(compactor: &Compactor, log: &mut ActionLog, actions: Vec<Action>) {
        for action in actions {
            compactor.append(log, action, Some(Duration::from_millis(50)));
        }
    }

    #[test]
    fn test_repeat_collapsing() {
        let compactor = compactor();
        let mut log = ActionLog::new();
        let backspace = Action::delete(DeleteKind::ContentBackward, None);

        append_all(&compactor, &mut log, vec![backspace.clone(); 4]);

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].repeat, 4);
        assert_eq!(log.entries()[0].action, backspace);
        assert_eq!(unpack(&log), vec![backspace; 4]);
    }

    #[test]
    fn test_full_repeat_starts_new_entry() {
        let backspace = Action::delete(DeleteKind::ContentBackward, None);
        let mut log = ActionLog::from_entries(vec![LogEntry {
            action: backspace.clone(),
            repeat: MAX_REPEAT,
            split: false,
        }]);

        let outcome = compactor().append(&mut log, backspace.clone(), None);

        assert_eq!(outcome.merge, MergeKind::Appended);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].repeat, 1);
        assert_eq!(log.expanded_len(), MAX_REPEAT as usize + 1);
    }

    #[test]
    fn test_character_run_batching() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        let first = compactor.append(&mut log, Action::insert_text("a"), None);
        let second = compactor.append(&mut log, Action::insert_text("b"), None);
        let third = compactor.append(&mut log, Action::insert_text("c"), None);

        assert_eq!(first.merge, MergeKind::Appended);
        assert_eq!(second.merge, MergeKind::ExtendedRun);
        assert_eq!(third.merge, MergeKind::ExtendedRun);

        assert_eq!(log.len(), 1);
        let entry = &log.entries()[0];
        assert!(entry.split);
        assert_eq!(entry.action.inserted_text(), Some("abc"));

        assert_eq!(
            unpack(&log),
            vec![
                Action::insert_text("a"),
                Action::insert_text("b"),
                Action::insert_text("c"),
            ]
        );
    }

    #[test]
    fn test_insert_text_never_repeats() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![Action::insert_text("ab"), Action::insert_text("ab")],
        );

        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.repeat == 1));
    }

    #[test]
    fn test_multi_char_insert_starts_no_run() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![
                Action::insert_text("pasted"),
                Action::insert_text("x"),
                Action::insert_text("y"),
            ],
        );

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].action.inserted_text(), Some("pasted"));
        assert!(!log.entries()[0].split);
        assert_eq!(log.entries()[1].action.inserted_text(), Some("xy"));
        assert!(log.entries()[1].split);
    }

    #[test]
    fn test_run_stops_at_surface_switch() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![
                Action::insert_text("a"),
                Action::insert_text("b").with_editor("css"),
                Action::insert_text("c"),
            ],
        );

        // Neither side of a switch joins a run
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0].action.inserted_text(), Some("a"));
        assert_eq!(log.entries()[1].action.editor.as_deref(), Some("css"));
        assert_eq!(log.entries()[1].action.inserted_text(), Some("b"));
        assert_eq!(log.entries()[2].action, Action::insert_text("c"));
        assert!(log.iter().all(|e| !e.split));
    }

    #[test]
    fn test_caret_replacement() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![
                Action::insert_text("hello"),
                Action::caret(1, 1),
                Action::caret(2, 2),
                Action::caret(2, 4),
            ],
        );

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].action.kind, ActionKind::Caret(Span::new(2, 4)));
    }

    #[test]
    fn test_caret_changes_preserved_when_configured() {
        let compactor = Compactor::new(&RecorderConfig::default().with_preserve_caret_changes(true));
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![Action::caret(1, 1), Action::caret(2, 2), Action::caret(3, 3)],
        );

        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_caret_replacement_keeps_editor_switch() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![Action::caret(0, 0).with_editor("html"), Action::caret(3, 3)],
        );

        assert_eq!(log.len(), 1);
        let survivor = &log.entries()[0].action;
        assert_eq!(survivor.kind, ActionKind::Caret(Span::caret(3)));
        assert_eq!(survivor.editor.as_deref(), Some("html"));
    }

    #[test]
    fn test_editor_precedence_across_consecutive_switches() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        append_all(
            &compactor,
            &mut log,
            vec![
                Action::caret(0, 0).with_editor("html"),
                Action::caret(5, 5).with_editor("css"),
                Action::caret(7, 7),
                Action::caret(8, 8),
            ],
        );

        // A switching caret is never replaced by another switch; plain moves
        // fold into the most recent switch.
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].action.editor.as_deref(), Some("html"));
        assert_eq!(log.entries()[0].action.kind, ActionKind::Caret(Span::caret(0)));
        assert_eq!(log.entries()[1].action.editor.as_deref(), Some("css"));
        assert_eq!(log.entries()[1].action.kind, ActionKind::Caret(Span::caret(8)));
    }

    #[test]
    fn test_idle_gap_inserts_single_pause() {
        let compactor = Compactor::new(
            &RecorderConfig::default()
                .with_pause_threshold(Some(Duration::from_secs(2)))
                .with_pause_cap(Duration::from_secs(5)),
        );
        let mut log = ActionLog::new();

        compactor.append(&mut log, Action::insert_text("a"), None);
        let outcome = compactor.append(&mut log, Action::insert_text("b"), Some(Duration::from_secs(3)));
        assert_eq!(outcome.pause, Some(3000));

        let outcome = compactor.append(&mut log, Action::insert_text("c"), Some(Duration::from_secs(60)));
        assert_eq!(outcome.pause, Some(5000));

        let kinds: Vec<_> = log.iter().map(|e| e.action.type_name()).collect();
        assert_eq!(kinds, vec!["insertText", "pause", "insertText", "pause", "insertText"]);
        assert_eq!(log.entries()[1].action, Action::pause(3000));
        assert_eq!(log.entries()[3].action, Action::pause(5000));
    }

    #[test]
    fn test_gap_at_threshold_records_nothing() {
        let compactor = compactor();
        let mut log = ActionLog::new();

        compactor.append(&mut log, Action::insert_text("a"), None);
        let outcome = compactor.append(&mut log, Action::insert_text("b"), Some(Duration::from_secs(2)));

        assert_eq!(outcome.pause, None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_pause_recording_disabled() {
        let compactor = Compactor::new(&RecorderConfig::default().with_record_pauses(false));
        let mut log = ActionLog::new();

        compactor.append(&mut log, Action::replace("x"), None);
        compactor.append(&mut log, Action::replace("y"), Some(Duration::from_secs(30)));

        assert!(log.iter().all(|e| !e.action.is_pause()));
    }

    #[test]
    fn test_pauses_never_adjacent() {
        let compactor = Compactor::new(&RecorderConfig::default().with_pause_cap(Duration::from_secs(4)));
        let mut log = ActionLog::new();

        compactor.append(&mut log, Action::insert_text("a"), None);
        compactor.append(&mut log, Action::pause(1000), Some(Duration::from_secs(3)));
        compactor.append(&mut log, Action::pause(1500), None);

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].action, Action::pause(4000));
        assert_eq!(log.entries()[1].repeat, 1);
    }

    #[test]
    fn test_pack_matches_recording_rules() {
        let actions = vec![
            Action::insert_text("a"),
            Action::insert_text("b"),
            Action::caret(1, 1),
            Action::caret(1, 1),
            Action::caret(2, 2),
            Action::delete(DeleteKind::ContentForward, None),
            Action::delete(DeleteKind::ContentForward, None),
        ];

        let log = pack(actions.clone());

        assert_eq!(log.len(), 4);
        assert!(log.entries()[0].split);
        assert_eq!(log.entries()[1].repeat, 2);
        assert_eq!(log.entries()[2].action, Action::caret(2, 2));
        assert_eq!(log.entries()[3].repeat, 2);
        assert_eq!(unpack(&log), actions);
    }
}
