//! Interaction adjudication: the disconnect-cancellation policy.
//!
//! A pure decision function, independent of any game's rules, deciding
//! whether a pending interaction must be force-cancelled because its owner
//! disconnected. Invoked by connection-management infrastructure whenever a
//! player's connection status changes; the returned decision is turned into
//! a synthetic cancellation command fed back through the pipeline.
//!
//! The ladder is deliberately conservative: an interaction is only
//! auto-cancelled when a *specific, currently locked* prompt belongs to a
//! *disconnected* player in a *live* match. Any ambiguity - stale lock,
//! mismatched owner, no lock at all - resolves to leaving the interaction
//! pending rather than risking cancelling a decision that is mid-flight or
//! belongs to someone else.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::command::CommandType;
use crate::core::{Command, MatchState, PlayerId};
use crate::systems::interaction::InteractionId;

/// Per-player connection metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConnection {
    /// `Some(false)` means known-disconnected; `Some(true)` and `None`
    /// (unknown) both count as connected for adjudication purposes.
    pub is_connected: Option<bool>,
}

/// Connection-management metadata for one match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Known players and their connection state.
    pub players: FxHashMap<PlayerId, PlayerConnection>,

    /// Metadata-level game-over flag (set by the host when a match ends).
    pub game_over: bool,
}

impl MatchMetadata {
    /// Create empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a player's connection state (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: PlayerId, is_connected: Option<bool>) -> Self {
        self.players.insert(player, PlayerConnection { is_connected });
        self
    }

    /// Update a player's connection state in place.
    pub fn set_connected(&mut self, player: PlayerId, is_connected: bool) {
        self.players
            .entry(player)
            .or_default()
            .is_connected = Some(is_connected);
    }
}

/// Why an interaction was left pending.
///
/// Not errors: informative decisions, logged for observability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepReason {
    /// No match state was supplied.
    MissingState,
    /// The match is already over; its interactions are irrelevant.
    GameOver,
    /// No connection metadata exists for the match.
    MissingMetadata,
    /// The target player is unknown in the metadata.
    PlayerNotFound,
    /// The target player is currently connected.
    PlayerConnected,
    /// No interaction is pending.
    NoPendingInteraction,
    /// The pending interaction belongs to a different player.
    InteractionOwnerMismatch,
    /// No response-window lock is set.
    NoPendingInteractionLock,
    /// The lock does not name the pending interaction.
    InteractionLockMismatch,
}

impl KeepReason {
    /// Stable snake_case label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KeepReason::MissingState => "missing_state",
            KeepReason::GameOver => "game_over",
            KeepReason::MissingMetadata => "missing_metadata",
            KeepReason::PlayerNotFound => "player_not_found",
            KeepReason::PlayerConnected => "player_connected",
            KeepReason::NoPendingInteraction => "no_pending_interaction",
            KeepReason::InteractionOwnerMismatch => "interaction_owner_mismatch",
            KeepReason::NoPendingInteractionLock => "no_pending_interaction_lock",
            KeepReason::InteractionLockMismatch => "interaction_lock_mismatch",
        }
    }
}

/// The adjudicator's decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjudicationDecision {
    /// Whether the pending interaction must be force-cancelled.
    pub should_cancel: bool,

    /// Why the interaction was left pending (absent when cancelling).
    pub reason: Option<KeepReason>,

    /// The interaction to cancel (present only when cancelling).
    pub interaction_id: Option<InteractionId>,
}

impl AdjudicationDecision {
    fn keep(reason: KeepReason) -> Self {
        debug!(reason = reason.as_str(), "interaction left pending");
        Self {
            should_cancel: false,
            reason: Some(reason),
            interaction_id: None,
        }
    }

    fn cancel(id: InteractionId) -> Self {
        Self {
            should_cancel: true,
            reason: None,
            interaction_id: Some(id),
        }
    }

    /// Build the synthetic cancellation command for this decision, to be
    /// fed back through the pipeline by the caller.
    #[must_use]
    pub fn to_command(&self, player: PlayerId) -> Option<Command> {
        let id = self.interaction_id?;
        self.should_cancel.then(|| {
            Command::with_args(CommandType::INTERACTION_CANCEL, player, &[id.encode()])
        })
    }
}

/// Decide whether the pending interaction of `player` must be
/// force-cancelled. Short-circuits on the first applicable reason, in the
/// fixed order documented on [`KeepReason`].
#[must_use]
pub fn should_force_cancel<C>(
    state: Option<&MatchState<C>>,
    metadata: Option<&MatchMetadata>,
    player: PlayerId,
) -> AdjudicationDecision {
    let Some(state) = state else {
        return AdjudicationDecision::keep(KeepReason::MissingState);
    };

    let metadata_game_over = metadata.is_some_and(|m| m.game_over);
    if state.sys.game_over || metadata_game_over {
        return AdjudicationDecision::keep(KeepReason::GameOver);
    }

    let Some(metadata) = metadata else {
        return AdjudicationDecision::keep(KeepReason::MissingMetadata);
    };

    let Some(connection) = metadata.players.get(&player) else {
        return AdjudicationDecision::keep(KeepReason::PlayerNotFound);
    };

    if connection.is_connected != Some(false) {
        return AdjudicationDecision::keep(KeepReason::PlayerConnected);
    }

    let Some(pending) = &state.sys.interaction.current else {
        return AdjudicationDecision::keep(KeepReason::NoPendingInteraction);
    };

    if pending.player != player {
        return AdjudicationDecision::keep(KeepReason::InteractionOwnerMismatch);
    }

    let Some(lock) = state.sys.response_window.pending_interaction_id else {
        return AdjudicationDecision::keep(KeepReason::NoPendingInteractionLock);
    };

    if lock != pending.id {
        return AdjudicationDecision::keep(KeepReason::InteractionLockMismatch);
    }

    AdjudicationDecision::cancel(pending.id)
}
