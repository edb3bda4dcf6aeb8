//! Match events: immutable facts describing what changed.
//!
//! Events are the only legitimate way state changes. They are never reverted
//! in place; undo is modeled as new compensating snapshot states, not as
//! event deletion.
//!
//! ## Design Philosophy
//!
//! Event types are game-defined, not hardcoded. The engine doesn't know
//! about "damage dealt" or "card drawn" - games register these event types
//! and emit them from their reducers. The engine reserves a small range for
//! its own system events (interaction lifecycle, system errors).
//!
//! ## Timestamps
//!
//! `timestamp` is the logical command sequence number of the command that
//! produced the event, assigned by the pipeline. Wall-clock time would break
//! bit-exact replay and client/server comparison.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::command::CommandType;
use super::player::PlayerId;

/// Event type identifier. Games define what event types exist.
///
/// Values at or above [`EventTypeId::RESERVED_BASE`] are reserved for the
/// engine; games must allocate below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTypeId(pub u32);

impl EventTypeId {
    /// First engine-reserved event type.
    pub const RESERVED_BASE: u32 = 0xFFFF_FF00;

    /// A system requested a player interaction.
    ///
    /// `values[0]` = interaction kind.
    pub const INTERACTION_REQUESTED: EventTypeId = EventTypeId(0xFFFF_FF00);

    /// The pending interaction was resolved by its owner.
    ///
    /// `values[0]` = interaction id, `values[1]` = kind,
    /// `values[2..]` = selected option values.
    pub const INTERACTION_RESOLVED: EventTypeId = EventTypeId(0xFFFF_FF01);

    /// The pending interaction was force-cancelled.
    ///
    /// `values[0]` = interaction id.
    pub const INTERACTION_CANCELLED: EventTypeId = EventTypeId(0xFFFF_FF02);

    /// An engine system rejected an operation mid-pipeline.
    ///
    /// `values[0]` = error code (see [`sys_error`]).
    pub const SYSTEM_ERROR: EventTypeId = EventTypeId(0xFFFF_FF03);

    /// Create a new event type ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this is an engine-reserved event type.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 >= Self::RESERVED_BASE
    }
}

impl std::fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventType({})", self.0)
    }
}

/// Error codes carried by [`EventTypeId::SYSTEM_ERROR`] events.
pub mod sys_error {
    /// An interaction was requested while another was still pending.
    pub const INTERACTION_ALREADY_PENDING: i64 = 1;
    /// An interaction was requested with an unregistered kind.
    pub const UNKNOWN_INTERACTION_KIND: i64 = 2;
}

/// A match event with contextual data.
///
/// Events carry:
/// - `event_type`: what kind of event this is
/// - `player`: the player associated with the event (if any)
/// - `values`: numeric values, game-defined meaning per index
/// - `source_command`: the command type whose execution produced the event
/// - `timestamp`: logical command sequence number, pipeline-assigned
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The type of event.
    pub event_type: EventTypeId,

    /// The player associated with the event.
    pub player: Option<PlayerId>,

    /// Numeric values associated with the event.
    /// Games define the meaning of each index.
    pub values: SmallVec<[i64; 4]>,

    /// The command type that produced this event.
    pub source_command: Option<CommandType>,

    /// Logical command sequence number (pipeline-assigned).
    pub timestamp: u64,
}

impl Event {
    /// Create a new event with just a type.
    #[must_use]
    pub fn new(event_type: EventTypeId) -> Self {
        Self {
            event_type,
            player: None,
            values: SmallVec::new(),
            source_command: None,
            timestamp: 0,
        }
    }

    /// Set the associated player (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = Some(player);
        self
    }

    /// Add a numeric value (builder pattern).
    #[must_use]
    pub fn with_value(mut self, value: i64) -> Self {
        self.values.push(value);
        self
    }

    /// Add several numeric values (builder pattern).
    #[must_use]
    pub fn with_values(mut self, values: &[i64]) -> Self {
        self.values.extend_from_slice(values);
        self
    }

    /// Create a player-centric event (like turn passed).
    #[must_use]
    pub fn for_player(event_type: EventTypeId, player: PlayerId) -> Self {
        Self::new(event_type).with_player(player)
    }

    /// Get a value by index, or a default.
    #[must_use]
    pub fn value(&self, index: usize, default: i64) -> i64 {
        self.values.get(index).copied().unwrap_or(default)
    }
}

/// Constructors for engine-reserved system events.
impl Event {
    /// A request to prompt `player` with an interaction of `kind`.
    ///
    /// The interaction id and option set are assigned when the event is
    /// folded, against the state as of that point.
    #[must_use]
    pub fn interaction_requested(kind: i64, player: PlayerId) -> Self {
        Self::new(EventTypeId::INTERACTION_REQUESTED)
            .with_player(player)
            .with_value(kind)
    }

    /// The pending interaction `id` of `kind` was resolved with `selection`.
    #[must_use]
    pub fn interaction_resolved(id: i64, kind: i64, player: PlayerId, selection: &[i64]) -> Self {
        Self::new(EventTypeId::INTERACTION_RESOLVED)
            .with_player(player)
            .with_value(id)
            .with_value(kind)
            .with_values(selection)
    }

    /// The pending interaction `id` was force-cancelled.
    #[must_use]
    pub fn interaction_cancelled(id: i64, player: PlayerId) -> Self {
        Self::new(EventTypeId::INTERACTION_CANCELLED)
            .with_player(player)
            .with_value(id)
    }

    /// An engine system rejected an operation; `code` is a [`sys_error`] value.
    #[must_use]
    pub fn system_error(code: i64, player: Option<PlayerId>) -> Self {
        let mut event = Self::new(EventTypeId::SYSTEM_ERROR).with_value(code);
        event.player = player;
        event
    }
}
