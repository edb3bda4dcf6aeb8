//! Client-side optimistic executor.
//!
//! Runs deterministic commands through the local pipeline immediately so the
//! UI can render the predicted result while the command travels to the
//! server, then reconciles the prediction against the canonical
//! confirmation. Commands that depend on server-owned randomness or hidden
//! information are never predicted - the UI shows a pending state until the
//! server responds.
//!
//! ## Chained prediction
//!
//! Unconfirmed predictions form a FIFO; each new prediction runs against the
//! newest predicted state, so a burst of local inputs renders without
//! waiting. Reconciliation re-bases the whole queue onto each server
//! confirmation, dropping predictions that no longer validate.
//!
//! ## The randomness probe
//!
//! Commands without an explicit determinism declaration are probed: the
//! local run executes normally, and if the RNG draw counter moved, the
//! prediction is discarded and the command is sent without rendering.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::core::state::MatchState;
use crate::core::{Command, MatchRng};
use crate::domain::DomainCore;
use crate::pipeline::Pipeline;

use super::config::{AnimationMode, CommandDeterminism};

/// What the client should render after submitting a command.
#[derive(Clone, Debug)]
pub enum PredictionOutcome<C> {
    /// The command was predicted locally; render this state now.
    Predicted {
        /// The predicted state.
        state: MatchState<C>,
        /// How predicted events drive animation.
        animation: AnimationMode,
    },

    /// No local prediction; send the command and wait for confirmation.
    SendOnly,
}

impl<C> PredictionOutcome<C> {
    /// Check whether a prediction was made.
    #[must_use]
    pub fn is_predicted(&self) -> bool {
        matches!(self, PredictionOutcome::Predicted { .. })
    }
}

/// Result of reconciling a server confirmation.
#[derive(Clone, Debug)]
pub struct ReconcileOutcome<C> {
    /// The state the client should render.
    pub state: MatchState<C>,

    /// Whether unconfirmed predictions were discarded in favor of canonical
    /// truth. Recovered internally; never surfaced to the user as an error.
    pub rolled_back: bool,

    /// On rollback, the highest event id already animated optimistically.
    /// The consumer filters replayed entries at or below this id so
    /// animations do not play twice.
    pub replayed_watermark: Option<i64>,
}

/// One unconfirmed prediction.
#[derive(Clone, Debug)]
struct PendingPrediction<C> {
    command: Command,
    predicted: MatchState<C>,
}

/// The client half of the latency-optimized transport.
pub struct OptimisticExecutor<D: DomainCore> {
    pipeline: Arc<Pipeline<D>>,
    confirmed: Option<MatchState<D::State>>,
    pending: VecDeque<PendingPrediction<D::State>>,
    watermark: Option<i64>,
    rng: MatchRng,
}

impl<D: DomainCore> OptimisticExecutor<D> {
    /// Create an executor over a shared pipeline.
    ///
    /// `local_seed` seeds the client-side RNG used for probing; it never
    /// influences canonical state.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline<D>>, local_seed: u64) -> Self {
        Self {
            pipeline,
            confirmed: None,
            pending: VecDeque::new(),
            watermark: None,
            rng: MatchRng::new(local_seed),
        }
    }

    /// Install the first confirmed state (initial sync).
    pub fn set_confirmed(&mut self, state: MatchState<D::State>) {
        self.confirmed = Some(state);
    }

    /// The newest state: the last prediction, or the confirmed state.
    #[must_use]
    pub fn current_state(&self) -> Option<&MatchState<D::State>> {
        self.pending
            .back()
            .map(|p| &p.predicted)
            .or(self.confirmed.as_ref())
    }

    /// Check whether unconfirmed predictions exist.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Process a command submission: predict locally when safe.
    ///
    /// The command must be sent to the server in every case; the outcome
    /// only decides what the client renders meanwhile.
    pub fn process_command(&mut self, command: &Command) -> PredictionOutcome<D::State> {
        let Some(base) = self.current_state().cloned() else {
            return PredictionOutcome::SendOnly;
        };

        let config = self.pipeline.domain().latency_config();
        let declared = config.determinism_of(command.command_type);
        if declared == Some(CommandDeterminism::Nondeterministic) {
            return PredictionOutcome::SendOnly;
        }

        let probing = declared.is_none();
        let draws_before = self.rng.draws();

        let outcome = match self.pipeline.execute(&base, command, &mut self.rng) {
            Ok(outcome) => outcome,
            Err(err) => {
                // Local rejection is not authoritative; the server decides.
                debug!(%err, "prediction skipped: local validation failed");
                return PredictionOutcome::SendOnly;
            }
        };

        if probing && self.rng.draws() != draws_before {
            debug!(command = %command.command_type, "prediction discarded: consumed randomness");
            return PredictionOutcome::SendOnly;
        }
        if outcome.is_noop() {
            return PredictionOutcome::SendOnly;
        }

        let animation = config.animation_of(command.command_type);
        let mut predicted = outcome.state;
        match animation {
            AnimationMode::Optimistic => {
                if let Some(max_id) = predicted.sys.event_stream.last_id() {
                    self.watermark = Some(self.watermark.map_or(max_id, |w| w.max(max_id)));
                }
            }
            AnimationMode::WaitConfirm => {
                // Strip predicted stream entries; animations wait for the
                // canonical confirmation.
                predicted.sys.event_stream = base.sys.event_stream.clone();
            }
        }

        self.pending.push_back(PendingPrediction {
            command: command.clone(),
            predicted: predicted.clone(),
        });

        PredictionOutcome::Predicted {
            state: predicted,
            animation,
        }
    }

    /// Reconcile a canonical server state against the prediction queue.
    ///
    /// If the head prediction matches the confirmation byte for byte, it is
    /// confirmed and dropped; otherwise every pending command is replayed on
    /// top of the canonical state, discarding commands that no longer
    /// validate. An emptied queue with discarded predictions is a rollback.
    pub fn reconcile(&mut self, confirmed: MatchState<D::State>) -> ReconcileOutcome<D::State> {
        self.confirmed = Some(confirmed.clone());

        if self.pending.is_empty() {
            self.watermark = None;
            return ReconcileOutcome {
                state: confirmed,
                rolled_back: false,
                replayed_watermark: None,
            };
        }

        let head_confirmed = self.pending.front().is_some_and(|p| {
            match (core_bytes(&p.predicted.core), core_bytes(&confirmed.core)) {
                (Some(predicted), Some(canonical)) => predicted == canonical,
                _ => false,
            }
        });
        if head_confirmed {
            self.pending.pop_front();
        }

        let to_replay = self.pending.len();
        self.replay_pending(&confirmed);
        let dropped = to_replay - self.pending.len();

        if let Some(last) = self.pending.back() {
            if dropped > 0 {
                debug!(dropped, "replay dropped stale tail predictions");
            }
            return ReconcileOutcome {
                state: last.predicted.clone(),
                rolled_back: false,
                replayed_watermark: None,
            };
        }

        let rolled_back = dropped > 0;
        let watermark = self.watermark.take();
        ReconcileOutcome {
            state: confirmed,
            rolled_back,
            replayed_watermark: if rolled_back { watermark } else { None },
        }
    }

    /// Discard all predictions and confirmed state (disconnect/reconnect).
    pub fn reset(&mut self) {
        self.pending.clear();
        self.confirmed = None;
        self.watermark = None;
    }

    /// Re-predict the pending queue on top of a canonical base state.
    ///
    /// A command that fails in the new state drops itself and everything
    /// after it.
    fn replay_pending(&mut self, base: &MatchState<D::State>) {
        let mut replayed = VecDeque::with_capacity(self.pending.len());
        let mut current = base.clone();
        let config = self.pipeline.domain().latency_config();

        for pending in self.pending.drain(..) {
            let Ok(outcome) = self.pipeline.execute(&current, &pending.command, &mut self.rng)
            else {
                break;
            };
            if outcome.is_noop() {
                break;
            }

            let mut predicted = outcome.state;
            if config.animation_of(pending.command.command_type) == AnimationMode::WaitConfirm {
                predicted.sys.event_stream = current.sys.event_stream.clone();
            }
            current = predicted.clone();
            replayed.push_back(PendingPrediction {
                command: pending.command,
                predicted,
            });
        }

        self.pending = replayed;
    }
}

/// Serialize a core for byte-identical comparison. A serialization failure
/// compares unequal to everything, which degrades to a full replay.
fn core_bytes<C: serde::Serialize>(core: &C) -> Option<Vec<u8>> {
    bincode::serialize(core).ok()
}
