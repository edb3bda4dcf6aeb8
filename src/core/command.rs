//! Command representation: a requested state transition.
//!
//! Commands are compositional: a command type (the "verb") plus encoded
//! arguments (the "nouns"). For example:
//! - "Pass" = type only, no args
//! - "Play card X" = type + 1 arg (the card)
//! - "Strike with X targeting Y" = type + 2 args
//!
//! Games define their command types; the engine doesn't interpret them,
//! with the exception of a small reserved range used by the engine's own
//! systems (interaction responses and adjudication-issued cancellations).
//!
//! Arguments use the engine-wide state-value encoding: everything is `i64`
//! (entity references, amounts, option values, boolean 0/1).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::player::PlayerId;

/// Command type identifier. Games define what command types exist.
///
/// Values at or above [`CommandType::RESERVED_BASE`] are reserved for the
/// engine; games must allocate below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandType(pub u16);

impl CommandType {
    /// First engine-reserved command type.
    pub const RESERVED_BASE: u16 = 0xFF00;

    /// Engine-reserved: a player's response to the pending interaction.
    ///
    /// `args[0]` = interaction id, `args[1..]` = selected option values.
    pub const INTERACTION_RESPOND: CommandType = CommandType(0xFF00);

    /// Engine-reserved: force-cancel the pending interaction.
    ///
    /// Issued by the adjudication caller, never by players directly.
    /// `args[0]` = interaction id.
    pub const INTERACTION_CANCEL: CommandType = CommandType(0xFF01);

    /// Create a new command type ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check whether this is an engine-reserved command type.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        self.0 >= Self::RESERVED_BASE
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Command({})", self.0)
    }
}

/// Client-generated identifier used to match a submitted command with its
/// eventual server confirmation. Opaque to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientCommandId(pub u64);

impl ClientCommandId {
    /// Create a new client command ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// A single player intent. Immutable, submitted once.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// The type of command.
    pub command_type: CommandType,

    /// The submitting player.
    pub player: PlayerId,

    /// Encoded arguments. SmallVec optimizes for 0-3 args (common case)
    /// without heap allocation.
    pub args: SmallVec<[i64; 3]>,

    /// Client-side correlation id for latency-optimized submission.
    pub client_id: Option<ClientCommandId>,
}

impl Command {
    /// Create a command with no arguments.
    #[must_use]
    pub fn new(command_type: CommandType, player: PlayerId) -> Self {
        Self {
            command_type,
            player,
            args: SmallVec::new(),
            client_id: None,
        }
    }

    /// Create a command with the given arguments.
    #[must_use]
    pub fn with_args(command_type: CommandType, player: PlayerId, args: &[i64]) -> Self {
        Self {
            command_type,
            player,
            args: SmallVec::from_slice(args),
            client_id: None,
        }
    }

    /// Attach a client correlation id (builder pattern).
    #[must_use]
    pub fn with_client_id(mut self, id: ClientCommandId) -> Self {
        self.client_id = Some(id);
        self
    }

    /// Add an argument (builder pattern).
    #[must_use]
    pub fn with_arg(mut self, arg: i64) -> Self {
        self.args.push(arg);
        self
    }

    /// Get an argument by index, or a default.
    #[must_use]
    pub fn arg(&self, index: usize, default: i64) -> i64 {
        self.args.get(index).copied().unwrap_or(default)
    }
}
