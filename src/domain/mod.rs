//! Domain core contract: the per-game pure validate/execute/reduce triple.
//!
//! Games implement [`DomainCore`] to define their rules; the engine is
//! generic over it and never inspects the core state's shape. Everything a
//! domain does must be deterministic: randomness only through the injected
//! [`MatchRng`], no I/O, no wall-clock reads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Command, CommandType, Event, MatchRng, PlayerId};
use crate::systems::interaction::Interaction;
use crate::transport::config::LatencyConfig;

/// Structured reason a command was rejected before any state change.
///
/// This is the pipeline's only error channel: a rejected command produces
/// zero events and leaves the state untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    /// Game-specific rejection with a domain-supplied reason.
    #[error("{command_type} rejected: {reason}")]
    Rejected {
        /// The rejected command type.
        command_type: CommandType,
        /// Domain-supplied reason.
        reason: String,
    },

    /// The submitting player cannot act right now.
    #[error("{player} cannot act now")]
    NotPlayersTurn {
        /// The submitting player.
        player: PlayerId,
    },

    /// The match is already over; no further commands are accepted.
    #[error("match is already over")]
    GameOver,

    /// An interaction response selected too few or too many options.
    #[error("selection of {got} outside allowed range {min}..={max}")]
    SelectionCardinality {
        /// Number of options selected.
        got: usize,
        /// Minimum allowed.
        min: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// An interaction response selected the same option twice.
    #[error("option {value} selected more than once")]
    DuplicateSelection {
        /// The duplicated option value.
        value: i64,
    },

    /// An interaction response selected an option the live state no longer
    /// offers.
    #[error("option {value} is not currently available")]
    UnknownOption {
        /// The unavailable option value.
        value: i64,
    },
}

impl ValidationError {
    /// Convenience constructor for game-specific rejections.
    pub fn rejected(command_type: CommandType, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command_type,
            reason: reason.into(),
        }
    }
}

/// The per-game rules contract.
///
/// ## Implementation Notes
///
/// - `validate` must be side-effect free; it runs before any state change.
/// - `execute` translates a validated command into events and may draw from
///   the RNG; it must not mutate anything.
/// - `reduce` is the only way core state changes; it must be a pure function
///   of `(core, event)`.
/// - `on_interaction_resolved` lets a domain chain follow-up events (applied
///   choices, the next interaction of a sequence) off a resolved prompt.
pub trait DomainCore {
    /// The domain-owned core state. Serialization powers undo snapshots and
    /// byte-identical prediction comparison.
    type State: Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned;

    /// Build the initial core state for a match.
    fn setup(&self, player_count: usize, rng: &mut MatchRng) -> Self::State;

    /// Check whether a command is legal in the given state.
    fn validate(&self, core: &Self::State, command: &Command) -> Result<(), ValidationError>;

    /// Translate a validated command into its base event list.
    fn execute(&self, core: &Self::State, command: &Command, rng: &mut MatchRng) -> Vec<Event>;

    /// Apply one event to the core state.
    fn reduce(&self, core: &Self::State, event: &Event) -> Self::State;

    /// Translate a resolved interaction into follow-up events.
    ///
    /// `interaction` carries the freshly regenerated option set; `selection`
    /// has already passed cardinality and membership validation. Returning
    /// another `INTERACTION_REQUESTED` event here chains the next prompt of
    /// a sequence.
    fn on_interaction_resolved(
        &self,
        _core: &Self::State,
        _interaction: &Interaction,
        _selection: &[i64],
        _rng: &mut MatchRng,
    ) -> Vec<Event> {
        Vec::new()
    }

    /// Check whether the match has ended.
    fn is_game_over(&self, core: &Self::State) -> bool;

    /// The game's static latency-optimization policy.
    fn latency_config(&self) -> &LatencyConfig;
}
