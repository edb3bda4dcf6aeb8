//! Engine systems: generic cross-cutting state machines hooked into the
//! pipeline.
//!
//! Systems never touch the domain core's shape. Each one owns a slice of
//! [`SystemState`](crate::core::state::SystemState) and participates in
//! command execution twice:
//!
//! 1. **Command hook** (`on_command`): runs after the domain reducer, in
//!    registration order. A hook may append events to the candidate list,
//!    rewrite entries (e.g. degrade an over-capacity interaction request to
//!    a system error event), or veto the command outright - a veto empties
//!    the event list and the command becomes a no-op.
//! 2. **Event consumption** (`apply`): runs once per folded event, after the
//!    core reducer, to materialize the system's own state.

pub mod event_stream;
pub mod interaction;
pub mod response_window;

pub use event_stream::{
    compute_delta, EventStream, EventStreamEntry, EventStreamSystem, StreamDelta, CURSOR_START,
    DEFAULT_STREAM_CAPACITY,
};
pub use interaction::{
    check_response, Cardinality, Interaction, InteractionId, InteractionKind,
    InteractionKindConfig, InteractionRegistry, InteractionState, InteractionSystem,
    OptionsGenerator, ResponseCheck,
};
pub use response_window::{ResponseWindow, ResponseWindowSystem};

use crate::core::event::Event;
use crate::core::state::SystemState;
use crate::core::{Command, MatchState};

/// Verdict of a system's command hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookVerdict {
    /// Proceed with the (possibly modified) event list.
    Continue,

    /// Reject the command: the event list is emptied and the command folds
    /// to a no-op. The reason is logged, not surfaced as an error.
    Veto(&'static str),
}

/// A cross-cutting engine system.
///
/// Implementations must be pure: no I/O, no randomness outside the injected
/// RNG, deterministic for identical inputs.
pub trait EngineSystem<C>: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// Command hook: inspect the command and the candidate event list after
    /// the domain reducer ran. May append or rewrite events, or veto.
    fn on_command(
        &self,
        state: &MatchState<C>,
        command: &Command,
        events: &mut Vec<Event>,
    ) -> HookVerdict;

    /// Event-consumption hook: materialize system state for one folded
    /// event. The core has already been reduced past this event.
    fn apply(&self, sys: &mut SystemState, core: &C, event: &Event);
}
