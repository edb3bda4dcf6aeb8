//! Transport wire contract: envelopes and responses.
//!
//! The client submits a command envelope; the server answers with the
//! canonical events the submission produced and a per-command receipt.
//! Batches share the same shapes - a single submission is a batch of one.

use serde::{Deserialize, Serialize};

use crate::core::{ClientCommandId, Command};
use crate::domain::ValidationError;
use crate::systems::event_stream::EventStreamEntry;

/// Match identifier, allocated by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl MatchId {
    /// Create a new match ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match({})", self.0)
    }
}

/// Client → server command submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// The target match.
    pub match_id: MatchId,

    /// The command, carrying the client correlation id.
    pub command: Command,
}

/// What happened to one command of a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStatus {
    /// The command was validated and its effects applied.
    Applied,

    /// The command failed validation; nothing was applied.
    Rejected(ValidationError),

    /// An earlier command in the batch failed; this one was never executed.
    Skipped,
}

impl CommandStatus {
    /// Check whether the command's effects were applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandStatus::Applied)
    }
}

/// Per-command result reported back to the submitting client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReceipt {
    /// The client correlation id, echoed back.
    pub client_id: Option<ClientCommandId>,

    /// What happened.
    pub status: CommandStatus,
}

/// Server → client confirmation for a submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// Per-command receipts, in submission order.
    pub results: Vec<CommandReceipt>,

    /// Canonical event-stream entries the submission appended.
    pub events: Vec<EventStreamEntry>,

    /// Logical state version (command sequence) after the submission.
    pub state_version: u64,
}
