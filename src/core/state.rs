//! Match state: the single mutable state of one match.
//!
//! ## MatchState
//!
//! `MatchState<C>` pairs the domain-owned core state `C` (opaque to the
//! engine) with the engine-owned `SystemState`. Exactly one mutable
//! `MatchState` exists per match at any time; all transitions are pure
//! functions `(state, command) -> (state', events)`.
//!
//! ## SystemState
//!
//! Cross-cutting machinery shared by every game: the pending interaction,
//! the response-window lock, the event-stream ring buffer, the undo
//! snapshot ring, the logical command sequence, and the domain-derived
//! game-over flag.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::systems::event_stream::EventStream;
use crate::systems::interaction::InteractionState;
use crate::systems::response_window::ResponseWindow;

/// Default number of retained undo snapshots.
pub const DEFAULT_UNDO_CAPACITY: usize = 8;

/// A compensating snapshot taken before a player command was applied.
///
/// Undo never deletes events; restoring a snapshot produces a *new* state
/// with a rewound event stream, which consumers observe as a reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    /// Serialized core state as of just before the command.
    pub core_bytes: Vec<u8>,

    /// Event stream `next_id` as of the snapshot.
    pub stream_next_id: i64,

    /// Logical command sequence as of the snapshot.
    pub command_seq: u64,
}

/// Bounded ring of undo snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoState {
    snapshots: Vector<UndoSnapshot>,
    max_snapshots: usize,
}

impl Default for UndoState {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }
}

impl UndoState {
    /// Create an empty ring with the given capacity.
    #[must_use]
    pub fn with_capacity(max_snapshots: usize) -> Self {
        Self {
            snapshots: Vector::new(),
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Push a snapshot, dropping the oldest beyond capacity.
    pub fn push(&mut self, snapshot: UndoSnapshot) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
        }
    }

    /// Remove and return the most recent snapshot.
    pub fn pop(&mut self) -> Option<UndoSnapshot> {
        self.snapshots.pop_back()
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check whether no snapshots are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Engine-owned cross-cutting state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    /// Pending interaction and id allocator.
    pub interaction: InteractionState,

    /// Response-window lock.
    pub response_window: ResponseWindow,

    /// Append-only event log (ring-bounded).
    pub event_stream: EventStream,

    /// Undo snapshot ring.
    pub undo: UndoState,

    /// Logical command sequence: number of state-changing commands applied.
    pub command_seq: u64,

    /// Domain-derived game-over flag, refreshed after every command.
    pub game_over: bool,
}

/// The complete state of one match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchState<C> {
    /// Domain-owned state, opaque to the engine.
    pub core: C,

    /// Engine-owned cross-cutting state.
    pub sys: SystemState,
}

impl<C> MatchState<C> {
    /// Create a fresh match state around a domain core.
    #[must_use]
    pub fn new(core: C) -> Self {
        Self {
            core,
            sys: SystemState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(seq: u64) -> UndoSnapshot {
        UndoSnapshot {
            core_bytes: vec![seq as u8],
            stream_next_id: 1,
            command_seq: seq,
        }
    }

    #[test]
    fn test_undo_ring_drops_oldest() {
        let mut undo = UndoState::with_capacity(2);

        undo.push(snapshot(1));
        undo.push(snapshot(2));
        undo.push(snapshot(3));

        assert_eq!(undo.len(), 2);
        assert_eq!(undo.pop().unwrap().command_seq, 3);
        assert_eq!(undo.pop().unwrap().command_seq, 2);
        assert!(undo.pop().is_none());
    }

    #[test]
    fn test_match_state_new_defaults() {
        let state: MatchState<i64> = MatchState::new(5);

        assert_eq!(state.core, 5);
        assert_eq!(state.sys.command_seq, 0);
        assert!(!state.sys.game_over);
        assert!(state.sys.interaction.current.is_none());
        assert!(state.sys.event_stream.is_empty());
        assert!(state.sys.undo.is_empty());
    }

    #[test]
    fn test_system_state_serde() {
        let sys = SystemState::default();
        let json = serde_json::to_string(&sys).unwrap();
        let deserialized: SystemState = serde_json::from_str(&json).unwrap();
        assert_eq!(sys, deserialized);
    }
}
