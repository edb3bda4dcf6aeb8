//! Deterministic scenario runner for pipeline and transport validation.
//!
//! The runner wires a server-side pipeline to one optimistic client per
//! seat and drives scripted command sequences through both, reconciling
//! every client against each canonical confirmation - the full
//! submit → predict → confirm → reconcile loop without any real transport.
//!
//! [`replay`] runs a script against a fresh match and returns the final
//! state with its serialized core bytes, which is what determinism
//! properties compare.

use std::sync::Arc;

use crate::core::state::MatchState;
use crate::core::{Command, Event, MatchRng, PlayerId};
use crate::domain::DomainCore;
use crate::pipeline::Pipeline;
use crate::systems::interaction::InteractionRegistry;
use crate::transport::wire::CommandStatus;
use crate::transport::OptimisticExecutor;

/// What happened to one scripted submission.
#[derive(Clone, Debug)]
pub struct StepReport {
    /// Whether the submitting client predicted the command locally.
    pub predicted: bool,

    /// The server's verdict.
    pub status: CommandStatus,

    /// Whether the submitting client rolled back on reconciliation.
    pub rolled_back: bool,
}

/// A server pipeline plus one optimistic client per seat.
pub struct ScenarioRunner<D: DomainCore> {
    pipeline: Arc<Pipeline<D>>,
    server_state: MatchState<D::State>,
    server_rng: MatchRng,
    clients: Vec<OptimisticExecutor<D>>,
}

impl<D: DomainCore> ScenarioRunner<D> {
    /// Build a runner: seeded server match, synced clients.
    #[must_use]
    pub fn new(
        domain: D,
        registry: InteractionRegistry<D::State>,
        player_count: usize,
        seed: u64,
    ) -> Self
    where
        D::State: 'static,
    {
        let pipeline = Arc::new(Pipeline::new(domain, registry));
        let mut server_rng = MatchRng::new(seed);
        let server_state = pipeline.create_match(player_count, &mut server_rng);

        let clients = (0..player_count as u64)
            .map(|i| {
                let local_seed = seed.wrapping_add((i + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
                let mut client = OptimisticExecutor::new(Arc::clone(&pipeline), local_seed);
                client.set_confirmed(server_state.clone());
                client
            })
            .collect();

        Self {
            pipeline,
            server_state,
            server_rng,
            clients,
        }
    }

    /// The shared pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline<D>> {
        &self.pipeline
    }

    /// The canonical server state.
    #[must_use]
    pub fn server_state(&self) -> &MatchState<D::State> {
        &self.server_state
    }

    /// A seat's optimistic client.
    pub fn client(&mut self, player: PlayerId) -> &mut OptimisticExecutor<D> {
        &mut self.clients[player.index()]
    }

    /// Drive one command through the full loop: the submitting client
    /// predicts, the server executes, every client reconciles against the
    /// canonical result.
    pub fn submit(&mut self, command: &Command) -> StepReport {
        let submitter = command.player.index();
        let predicted = self.clients[submitter].process_command(command).is_predicted();

        let status = match self.pipeline.execute(&self.server_state, command, &mut self.server_rng)
        {
            Ok(outcome) => {
                self.server_state = outcome.state;
                CommandStatus::Applied
            }
            Err(err) => CommandStatus::Rejected(err),
        };

        let mut rolled_back = false;
        for (index, client) in self.clients.iter_mut().enumerate() {
            let outcome = client.reconcile(self.server_state.clone());
            if index == submitter {
                rolled_back = outcome.rolled_back;
            }
        }

        StepReport {
            predicted,
            status,
            rolled_back,
        }
    }

    /// Drive a whole script, one full loop per command.
    pub fn run_script(&mut self, script: &[Command]) -> Vec<StepReport> {
        script.iter().map(|command| self.submit(command)).collect()
    }

    /// Check that every client with no pending predictions renders exactly
    /// the canonical state.
    #[must_use]
    pub fn clients_converged(&self) -> bool {
        self.clients.iter().all(|client| {
            client.has_pending()
                || client
                    .current_state()
                    .is_some_and(|state| *state == self.server_state)
        })
    }
}

/// Final state of a scripted replay.
#[derive(Clone, Debug)]
pub struct ReplayResult<C> {
    /// The final match state.
    pub state: MatchState<C>,

    /// Every event produced, in order.
    pub events: Vec<Event>,

    /// Serialized final core, for byte-identical comparison.
    pub core_bytes: Vec<u8>,
}

/// Run a script against a fresh seeded match, server-side only.
///
/// Rejected commands change nothing and the replay continues, matching the
/// engine's no-partial-effects failure semantics.
#[must_use]
pub fn replay<D: DomainCore>(
    pipeline: &Pipeline<D>,
    player_count: usize,
    seed: u64,
    script: &[Command],
) -> ReplayResult<D::State> {
    let mut rng = MatchRng::new(seed);
    let mut state = pipeline.create_match(player_count, &mut rng);
    let mut events = Vec::new();

    for command in script {
        if let Ok(outcome) = pipeline.execute(&state, command, &mut rng) {
            state = outcome.state;
            events.extend(outcome.events);
        }
    }

    let core_bytes = bincode::serialize(&state.core).unwrap_or_default();
    ReplayResult {
        state,
        events,
        core_bytes,
    }
}
