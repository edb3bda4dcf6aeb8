//! Event stream: the append-only, globally ordered event log of a match.
//!
//! Entry ids are contiguous, monotonically increasing, and never reused.
//! The log is bounded by a ring buffer for memory; trimming old entries
//! never disturbs the id sequence.
//!
//! The backing store is a persistent `im::Vector`, so readers (UI, animation
//! consumers) can snapshot the entries in O(1) and diff at their own pace
//! without ever observing a half-appended entry.
//!
//! ## Cursors
//!
//! Consumers track a `last_seen_id` cursor and call [`compute_delta`] to
//! obtain new entries. The delta computation also detects log rebuilds
//! (new match, snapshot restore) and rollbacks, reporting them as a reset
//! so the consumer can clear derived UI state.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::event::Event;
use crate::core::state::SystemState;
use crate::core::{Command, MatchState};

use super::{EngineSystem, HookVerdict};

/// Default ring-buffer capacity for the event stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

/// Cursor value meaning "nothing consumed yet".
pub const CURSOR_START: i64 = -1;

/// A single entry in the event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStreamEntry {
    /// Monotonic, contiguous id. Never reused within a stream generation.
    pub id: i64,

    /// The event.
    pub event: Event,
}

/// Bounded, append-only event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventStream {
    /// Entries, oldest first. Persistent structure for O(1) snapshot reads.
    entries: Vector<EventStreamEntry>,

    /// Id the next appended entry will receive.
    next_id: i64,

    /// Ring-buffer capacity.
    max_entries: usize,
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_CAPACITY)
    }
}

impl EventStream {
    /// Create an empty stream with the given ring capacity.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vector::new(),
            next_id: 1,
            max_entries: max_entries.max(1),
        }
    }

    /// Append an event, returning the id it was assigned.
    pub fn append(&mut self, event: Event) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(EventStreamEntry { id, event });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        id
    }

    /// The highest id appended so far, or `None` for a fresh stream.
    #[must_use]
    pub fn last_id(&self) -> Option<i64> {
        self.entries.back().map(|e| e.id)
    }

    /// Id the next appended entry will receive.
    #[must_use]
    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    /// Roll the stream back to a fresh generation starting at `next_id`.
    ///
    /// Used by snapshot restore: entries are cleared and the id sequence
    /// rewinds, which consumers observe as a reset via [`compute_delta`].
    pub fn rewind(&mut self, next_id: i64) {
        self.entries.clear();
        self.next_id = next_id;
    }

    /// O(1) snapshot of the entries for out-of-band readers.
    #[must_use]
    pub fn snapshot(&self) -> Vector<EventStreamEntry> {
        self.entries.clone()
    }

    /// Borrow the entries.
    #[must_use]
    pub fn entries(&self) -> &Vector<EventStreamEntry> {
        &self.entries
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the stream holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a cursor delta computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDelta {
    /// New entries in ascending id order.
    pub new_entries: Vec<EventStreamEntry>,

    /// Cursor value the consumer should store.
    pub next_last_seen_id: i64,

    /// The log was rebuilt or rolled back; derived state must be cleared.
    pub should_reset: bool,
}

/// Compute the entries a consumer has not yet seen.
///
/// Rules:
/// - Empty entries after having consumed something (`last_seen_id >= 0`)
///   means the log was rebuilt (new match, snapshot restore): report a reset
///   and rewind the cursor to [`CURSOR_START`] so all future entries count
///   as new.
/// - Empty entries with nothing consumed yet is the quiet initial state.
/// - A maximum id below the cursor means the log rolled back: report the
///   full entry list as new, flagged as a reset.
/// - Otherwise return entries with `id > last_seen_id` in ascending order
///   and advance the cursor to the maximum id seen.
#[must_use]
pub fn compute_delta(entries: &Vector<EventStreamEntry>, last_seen_id: i64) -> StreamDelta {
    let Some(max_id) = entries.back().map(|e| e.id) else {
        if last_seen_id >= 0 {
            return StreamDelta {
                new_entries: Vec::new(),
                next_last_seen_id: CURSOR_START,
                should_reset: true,
            };
        }
        return StreamDelta {
            new_entries: Vec::new(),
            next_last_seen_id: last_seen_id,
            should_reset: false,
        };
    };

    if max_id < last_seen_id {
        return StreamDelta {
            new_entries: entries.iter().cloned().collect(),
            next_last_seen_id: max_id,
            should_reset: true,
        };
    }

    let new_entries: Vec<_> = entries
        .iter()
        .filter(|e| e.id > last_seen_id)
        .cloned()
        .collect();
    let next_last_seen_id = new_entries.last().map_or(last_seen_id, |e| e.id);

    StreamDelta {
        new_entries,
        next_last_seen_id,
        should_reset: false,
    }
}

/// Engine system that materializes the event stream.
///
/// Registered last so that every event of a command - base, system-appended,
/// resolution - lands in the stream in fold order with contiguous ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventStreamSystem;

impl<C> EngineSystem<C> for EventStreamSystem {
    fn name(&self) -> &'static str {
        "event_stream"
    }

    fn on_command(
        &self,
        _state: &MatchState<C>,
        _command: &Command,
        _events: &mut Vec<Event>,
    ) -> HookVerdict {
        HookVerdict::Continue
    }

    fn apply(&self, sys: &mut SystemState, _core: &C, event: &Event) {
        sys.event_stream.append(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EventTypeId;

    fn entry(id: i64) -> EventStreamEntry {
        EventStreamEntry {
            id,
            event: Event::new(EventTypeId::new(1)),
        }
    }

    fn stream_of(ids: &[i64]) -> Vector<EventStreamEntry> {
        ids.iter().map(|&id| entry(id)).collect()
    }

    #[test]
    fn test_append_assigns_contiguous_ids() {
        let mut stream = EventStream::new(10);

        assert_eq!(stream.append(Event::new(EventTypeId::new(1))), 1);
        assert_eq!(stream.append(Event::new(EventTypeId::new(1))), 2);
        assert_eq!(stream.append(Event::new(EventTypeId::new(1))), 3);
        assert_eq!(stream.last_id(), Some(3));
    }

    #[test]
    fn test_ring_trims_oldest_without_disturbing_ids() {
        let mut stream = EventStream::new(3);

        for _ in 0..5 {
            stream.append(Event::new(EventTypeId::new(1)));
        }

        assert_eq!(stream.len(), 3);
        let ids: Vec<_> = stream.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(stream.next_id(), 6);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut stream = EventStream::new(10);
        stream.append(Event::new(EventTypeId::new(1)));

        let snap = stream.snapshot();
        stream.append(Event::new(EventTypeId::new(2)));

        assert_eq!(snap.len(), 1);
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_delta_empty_after_consumption_resets() {
        let delta = compute_delta(&Vector::new(), 5);

        assert!(delta.new_entries.is_empty());
        assert_eq!(delta.next_last_seen_id, CURSOR_START);
        assert!(delta.should_reset);
    }

    #[test]
    fn test_delta_empty_before_consumption_is_quiet() {
        let delta = compute_delta(&Vector::new(), CURSOR_START);

        assert!(delta.new_entries.is_empty());
        assert_eq!(delta.next_last_seen_id, CURSOR_START);
        assert!(!delta.should_reset);
    }

    #[test]
    fn test_delta_returns_only_unseen_entries() {
        let entries = stream_of(&[1, 2, 3]);
        let delta = compute_delta(&entries, 2);

        assert_eq!(delta.new_entries.len(), 1);
        assert_eq!(delta.new_entries[0].id, 3);
        assert_eq!(delta.next_last_seen_id, 3);
        assert!(!delta.should_reset);
    }

    #[test]
    fn test_delta_rollback_reports_full_entries_and_reset() {
        let entries = stream_of(&[1, 2]);
        let delta = compute_delta(&entries, 9);

        assert_eq!(delta.new_entries.len(), 2);
        assert_eq!(delta.next_last_seen_id, 2);
        assert!(delta.should_reset);
    }

    #[test]
    fn test_delta_no_new_entries_keeps_cursor() {
        let entries = stream_of(&[1, 2, 3]);
        let delta = compute_delta(&entries, 3);

        assert!(delta.new_entries.is_empty());
        assert_eq!(delta.next_last_seen_id, 3);
        assert!(!delta.should_reset);
    }

    #[test]
    fn test_rewind_clears_and_rewinds_ids() {
        let mut stream = EventStream::new(10);
        stream.append(Event::new(EventTypeId::new(1)));
        stream.append(Event::new(EventTypeId::new(1)));

        stream.rewind(2);

        assert!(stream.is_empty());
        assert_eq!(stream.next_id(), 2);
        assert_eq!(stream.append(Event::new(EventTypeId::new(1))), 2);
    }

    #[test]
    fn test_stream_serde() {
        let mut stream = EventStream::new(4);
        stream.append(Event::new(EventTypeId::new(1)));

        let json = serde_json::to_string(&stream).unwrap();
        let deserialized: EventStream = serde_json::from_str(&json).unwrap();
        assert_eq!(stream, deserialized);
    }
}
