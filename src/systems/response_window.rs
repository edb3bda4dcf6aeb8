//! Response window: the lock naming which interaction is authoritative.
//!
//! The window tracks the pending interaction an adjudicator is allowed to
//! force-cancel. Only exclusive interaction kinds take the lock; advisory
//! kinds stay cancellable by nobody, which resolves any ambiguity toward
//! leaving the interaction pending.
//!
//! The optional deadline is carried for callers that layer a soft timeout
//! on top; the engine itself never enforces it - adjudication is the only
//! cancellation path.

use serde::{Deserialize, Serialize};

use crate::core::event::{Event, EventTypeId};
use crate::core::state::SystemState;
use crate::core::{Command, MatchState};

use super::interaction::InteractionId;
use super::{EngineSystem, HookVerdict};

/// The response-window lock inside [`SystemState`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseWindow {
    /// The interaction currently holding the lock, if any.
    pub pending_interaction_id: Option<InteractionId>,

    /// Optional soft deadline (logical time), not enforced by the engine.
    pub deadline: Option<u64>,
}

impl ResponseWindow {
    /// Check whether the given interaction holds the lock.
    #[must_use]
    pub fn is_locked_by(&self, id: InteractionId) -> bool {
        self.pending_interaction_id == Some(id)
    }
}

/// Engine system maintaining the response-window lock.
///
/// Must be registered after the interaction system: when a request event
/// folds, the freshly materialized interaction is read back to take the
/// lock with its assigned id.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseWindowSystem;

impl<C> EngineSystem<C> for ResponseWindowSystem {
    fn name(&self) -> &'static str {
        "response_window"
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
        match event.event_type {
            EventTypeId::INTERACTION_REQUESTED => {
                if let Some(current) = &sys.interaction.current {
                    if current.exclusive {
                        sys.response_window.pending_interaction_id = Some(current.id);
                    }
                }
            }
            EventTypeId::INTERACTION_RESOLVED | EventTypeId::INTERACTION_CANCELLED => {
                let resolved = InteractionId::new(event.value(0, 0).max(0) as u64);
                if sys.response_window.is_locked_by(resolved) {
                    sys.response_window.pending_interaction_id = None;
                    sys.response_window.deadline = None;
                }
            }
            _ => {}
        }
    }
}
