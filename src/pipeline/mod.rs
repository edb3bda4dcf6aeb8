//! Command pipeline: validate → execute → system hooks → event fold → stream.
//!
//! The pipeline executes exactly one command against one match state and is
//! a pure function of `(state, command, rng position)`: re-running the same
//! command sequence against the same seed reproduces identical events,
//! byte for byte. This is what makes server-authoritative replay possible
//! and client-side optimistic prediction comparable to server truth.
//!
//! ## Step order
//!
//! 1. The domain validator runs; a rejection returns the structured error
//!    with zero events and no state change. Engine-reserved commands
//!    (interaction responses, adjudication cancellations) are validated by
//!    the interaction system instead of the domain.
//! 2. The domain reducer produces the base event list.
//! 3. Each registered system's command hook runs in registration order;
//!    hooks may append or rewrite events, or veto the command (the event
//!    list empties and the command becomes a no-op).
//! 4. Events fold one at a time: the core reducer first, then every
//!    system's event-consumption hook - the event stream system is
//!    registered last, so each event lands in the log in fold order with a
//!    strictly increasing id.
//! 5. Bookkeeping: the logical command sequence advances, the game-over
//!    flag is refreshed from the domain, and a pre-command undo snapshot is
//!    retained for player-issued commands.

use std::sync::Arc;
use tracing::debug;

use crate::core::command::CommandType;
use crate::core::event::Event;
use crate::core::state::{MatchState, UndoSnapshot};
use crate::core::{Command, MatchRng};
use crate::domain::{DomainCore, ValidationError};
use crate::systems::event_stream::EventStreamSystem;
use crate::systems::interaction::{
    check_response, InteractionRegistry, InteractionSystem, ResponseCheck,
};
use crate::systems::response_window::ResponseWindowSystem;
use crate::systems::{EngineSystem, HookVerdict};

/// Result of executing one command: the next state and the causally ordered
/// events it produced.
#[derive(Clone, Debug)]
pub struct PipelineOutcome<C> {
    /// The next match state.
    pub state: MatchState<C>,

    /// Events produced by the command, in fold order. Empty for no-ops
    /// (vetoed commands, stale interaction responses).
    pub events: Vec<Event>,
}

impl<C> PipelineOutcome<C> {
    /// Check whether the command folded to a no-op.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

/// The command execution pipeline for one game.
///
/// Built once per process (or per test) from the domain, with the
/// interaction kind registry passed in explicitly - the pipeline is a pure
/// function of its construction inputs, never of ambient globals.
pub struct Pipeline<D: DomainCore> {
    domain: D,
    registry: Arc<InteractionRegistry<D::State>>,
    systems: Vec<Box<dyn EngineSystem<D::State>>>,
}

impl<D: DomainCore> Pipeline<D> {
    /// Build a pipeline over a domain and its interaction registry.
    ///
    /// Registers the three engine systems in their required order:
    /// interaction, response window, event stream.
    #[must_use]
    pub fn new(domain: D, registry: InteractionRegistry<D::State>) -> Self
    where
        D::State: 'static,
    {
        let registry = Arc::new(registry);
        let systems: Vec<Box<dyn EngineSystem<D::State>>> = vec![
            Box::new(InteractionSystem::new(Arc::clone(&registry))),
            Box::new(ResponseWindowSystem),
            Box::new(EventStreamSystem),
        ];
        Self {
            domain,
            registry,
            systems,
        }
    }

    /// The domain this pipeline executes.
    #[must_use]
    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// The interaction kind registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InteractionRegistry<D::State>> {
        &self.registry
    }

    /// Create a fresh match state: seeded domain setup plus empty system
    /// state.
    #[must_use]
    pub fn create_match(&self, player_count: usize, rng: &mut MatchRng) -> MatchState<D::State> {
        MatchState::new(self.domain.setup(player_count, rng))
    }

    /// Execute one command.
    ///
    /// On `Err`, the caller's state is untouched and zero events were
    /// produced - a command is never partially applied. On `Ok`, the
    /// outcome carries the next state and the command's events (possibly
    /// empty for silent no-ops).
    pub fn execute(
        &self,
        state: &MatchState<D::State>,
        command: &Command,
        rng: &mut MatchRng,
    ) -> Result<PipelineOutcome<D::State>, ValidationError> {
        if state.sys.game_over {
            return Err(ValidationError::GameOver);
        }

        let mut events = self.base_events(state, command, rng)?;

        for system in &self.systems {
            match system.on_command(state, command, &mut events) {
                HookVerdict::Continue => {}
                HookVerdict::Veto(reason) => {
                    debug!(
                        system = system.name(),
                        reason,
                        command = %command.command_type,
                        "command vetoed"
                    );
                    events.clear();
                    break;
                }
            }
        }

        if events.is_empty() {
            return Ok(PipelineOutcome {
                state: state.clone(),
                events,
            });
        }

        let seq = state.sys.command_seq + 1;
        for event in &mut events {
            event.timestamp = seq;
            event.source_command.get_or_insert(command.command_type);
        }

        let mut next = state.clone();
        if !command.command_type.is_reserved() {
            self.retain_snapshot(&mut next, state);
        }

        for event in &events {
            next.core = self.domain.reduce(&next.core, event);
            for system in &self.systems {
                system.apply(&mut next.sys, &next.core, event);
            }
        }

        next.sys.command_seq = seq;
        next.sys.game_over = self.domain.is_game_over(&next.core);

        Ok(PipelineOutcome {
            state: next,
            events,
        })
    }

    /// Restore the most recent undo snapshot, producing a compensating new
    /// state: the snapshot core, a cleared event stream with a rewound id
    /// sequence, and no pending interaction. Consumers observe the rewind
    /// as a cursor reset. Returns `None` when no snapshot is retained or it
    /// fails to decode.
    #[must_use]
    pub fn restore_snapshot(&self, state: &MatchState<D::State>) -> Option<MatchState<D::State>> {
        let mut sys = state.sys.clone();
        let snapshot = sys.undo.pop()?;
        let core: D::State = bincode::deserialize(&snapshot.core_bytes).ok()?;

        sys.interaction.current = None;
        sys.response_window.pending_interaction_id = None;
        sys.response_window.deadline = None;
        sys.event_stream.rewind(snapshot.stream_next_id);
        sys.command_seq = snapshot.command_seq;
        sys.game_over = self.domain.is_game_over(&core);

        Some(MatchState { core, sys })
    }

    /// Produce the pre-hook event list for a command.
    fn base_events(
        &self,
        state: &MatchState<D::State>,
        command: &Command,
        rng: &mut MatchRng,
    ) -> Result<Vec<Event>, ValidationError> {
        match command.command_type {
            CommandType::INTERACTION_RESPOND => {
                match check_response(&self.registry, state, command)? {
                    ResponseCheck::Stale(reason) => {
                        debug!(reason, "stale interaction response discarded");
                        Ok(Vec::new())
                    }
                    ResponseCheck::Valid {
                        interaction,
                        selection,
                    } => {
                        let mut events = vec![Event::interaction_resolved(
                            interaction.id.encode(),
                            i64::from(interaction.kind.raw()),
                            interaction.player,
                            &selection,
                        )];
                        events.extend(self.domain.on_interaction_resolved(
                            &state.core,
                            &interaction,
                            &selection,
                            rng,
                        ));
                        Ok(events)
                    }
                }
            }
            CommandType::INTERACTION_CANCEL => {
                let Some(current) = &state.sys.interaction.current else {
                    debug!("cancellation with no pending interaction discarded");
                    return Ok(Vec::new());
                };
                if command.arg(0, -1) != current.id.encode() {
                    debug!("cancellation for a different interaction discarded");
                    return Ok(Vec::new());
                }
                Ok(vec![Event::interaction_cancelled(
                    current.id.encode(),
                    current.player,
                )])
            }
            _ => {
                self.domain.validate(&state.core, command)?;
                Ok(self.domain.execute(&state.core, command, rng))
            }
        }
    }

    /// Retain a pre-command snapshot of `previous` in `next`'s undo ring.
    fn retain_snapshot(&self, next: &mut MatchState<D::State>, previous: &MatchState<D::State>) {
        match bincode::serialize(&previous.core) {
            Ok(core_bytes) => next.sys.undo.push(UndoSnapshot {
                core_bytes,
                stream_next_id: previous.sys.event_stream.next_id(),
                command_seq: previous.sys.command_seq,
            }),
            Err(err) => debug!(%err, "undo snapshot skipped: core not serializable"),
        }
    }
}
