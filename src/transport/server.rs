//! Match host: the server half of the latency-optimized transport.
//!
//! Owns many independent matches. Each match is one unit of work with no
//! shared mutable state: command processing within a match is strictly
//! serial (all access threads through one `&mut` entry), while different
//! matches are embarrassingly parallel across hosts.

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::adjudication::{should_force_cancel, AdjudicationDecision, MatchMetadata};
use crate::core::state::MatchState;
use crate::core::{Command, MatchRng, PlayerId};
use crate::domain::DomainCore;
use crate::pipeline::Pipeline;
use crate::systems::event_stream::{compute_delta, StreamDelta};

use super::batch::execute_batch;
use super::wire::{CommandEnvelope, MatchId, ServerResponse};
use std::sync::Arc;

/// One hosted match: canonical state, server RNG, connection metadata.
struct HostedMatch<C> {
    state: MatchState<C>,
    rng: MatchRng,
    metadata: MatchMetadata,
}

/// Server-side owner of match states.
pub struct MatchHost<D: DomainCore> {
    pipeline: Arc<Pipeline<D>>,
    matches: FxHashMap<MatchId, HostedMatch<D::State>>,
    next_match_id: u64,
}

impl<D: DomainCore> MatchHost<D> {
    /// Create a host over a shared pipeline.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline<D>>) -> Self {
        Self {
            pipeline,
            matches: FxHashMap::default(),
            next_match_id: 1,
        }
    }

    /// Create a match with a seeded domain setup. All players start with
    /// unknown connection state.
    pub fn create_match(&mut self, player_count: usize, seed: u64) -> MatchId {
        let id = MatchId::new(self.next_match_id);
        self.next_match_id += 1;

        let mut rng = MatchRng::new(seed);
        let state = self.pipeline.create_match(player_count, &mut rng);
        let mut metadata = MatchMetadata::new();
        for player in PlayerId::all(player_count) {
            metadata.players.entry(player).or_default();
        }

        info!(%id, player_count, seed, "match created");
        self.matches.insert(
            id,
            HostedMatch {
                state,
                rng,
                metadata,
            },
        );
        id
    }

    /// Tear down a match record.
    pub fn destroy_match(&mut self, id: MatchId) -> bool {
        self.matches.remove(&id).is_some()
    }

    /// The canonical state of a match.
    #[must_use]
    pub fn state(&self, id: MatchId) -> Option<&MatchState<D::State>> {
        self.matches.get(&id).map(|m| &m.state)
    }

    /// The connection metadata of a match.
    #[must_use]
    pub fn metadata(&self, id: MatchId) -> Option<&MatchMetadata> {
        self.matches.get(&id).map(|m| &m.metadata)
    }

    /// Record a player's connection state.
    pub fn set_connected(&mut self, id: MatchId, player: PlayerId, is_connected: bool) {
        if let Some(hosted) = self.matches.get_mut(&id) {
            hosted.metadata.set_connected(player, is_connected);
        }
    }

    /// Execute a single submitted command. `None` for unknown matches.
    pub fn submit(&mut self, envelope: &CommandEnvelope) -> Option<ServerResponse> {
        self.submit_batch(envelope.match_id, std::slice::from_ref(&envelope.command))
    }

    /// Execute an ordered command batch strictly serially. `None` for
    /// unknown matches.
    pub fn submit_batch(&mut self, id: MatchId, commands: &[Command]) -> Option<ServerResponse> {
        let hosted = self.matches.get_mut(&id)?;

        let outcome = execute_batch(&self.pipeline, &hosted.state, commands, &mut hosted.rng);
        hosted.state = outcome.state;
        hosted.metadata.game_over = hosted.state.sys.game_over;

        Some(ServerResponse {
            results: outcome.receipts,
            events: outcome.new_entries,
            state_version: hosted.state.sys.command_seq,
        })
    }

    /// Event-stream delta for a reconnecting or lagging consumer.
    #[must_use]
    pub fn delta(&self, id: MatchId, last_seen_id: i64) -> Option<StreamDelta> {
        self.matches
            .get(&id)
            .map(|m| compute_delta(m.state.sys.event_stream.entries(), last_seen_id))
    }

    /// Run the adjudication policy for a player and, when it decides to
    /// cancel, feed the synthetic cancellation command through the pipeline.
    ///
    /// Called by connection-management infrastructure on connection changes.
    pub fn adjudicate(&mut self, id: MatchId, player: PlayerId) -> AdjudicationDecision {
        let Some(hosted) = self.matches.get_mut(&id) else {
            return should_force_cancel::<D::State>(None, None, player);
        };

        let decision = should_force_cancel(Some(&hosted.state), Some(&hosted.metadata), player);
        if let Some(command) = decision.to_command(player) {
            match self.pipeline.execute(&hosted.state, &command, &mut hosted.rng) {
                Ok(outcome) => {
                    debug!(%id, %player, "pending interaction force-cancelled");
                    hosted.state = outcome.state;
                }
                Err(err) => debug!(%id, %err, "force-cancel command rejected"),
            }
        }
        decision
    }
}
