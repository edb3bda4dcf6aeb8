//! Core types: players, commands, events, RNG, match state.

pub mod command;
pub mod event;
pub mod player;
pub mod rng;
pub mod state;

pub use command::{ClientCommandId, Command, CommandType};
pub use event::{Event, EventTypeId};
pub use player::{PlayerId, PlayerMap};
pub use rng::{MatchRng, MatchRngState};
pub use state::{MatchState, SystemState, UndoSnapshot, UndoState, DEFAULT_UNDO_CAPACITY};
