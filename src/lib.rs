//! # matchsync
//!
//! A deterministic command/event synchronization engine for turn-based
//! multiplayer games: one replayable pipeline shared by server and clients,
//! a mid-turn interaction protocol that survives disconnects, and a
//! latency-hiding transport that predicts safe commands on the client and
//! reconciles them against canonical server truth.
//!
//! ## Design Principles
//!
//! 1. **Game-Agnostic**: no hardcoded commands, events, or interaction
//!    kinds. Games supply a [`DomainCore`] and configure the rest at
//!    startup.
//!
//! 2. **Events Are Facts**: the only way state changes. Never reverted in
//!    place; undo is a compensating snapshot state, reconciliation replays
//!    canonical events.
//!
//! 3. **Determinism Everywhere**: all transitions are pure functions of
//!    `(state, command, rng position)`. Replaying a command script against
//!    the same seed reproduces state and event log byte for byte - which is
//!    what makes client predictions comparable to server results at all.
//!
//! ## Modules
//!
//! - `core`: players, commands, events, RNG, match state
//! - `domain`: the per-game validate/execute/reduce contract
//! - `pipeline`: single-command execution (validate → reduce → hooks → fold)
//! - `systems`: interaction, response window, event stream
//! - `adjudication`: disconnect-driven interaction cancellation policy
//! - `transport`: optimistic client executor, batching, match host, wire types
//! - `harness`: deterministic scenario runner for tests
//! - `games`: built-in demo domain

pub mod adjudication;
pub mod core;
pub mod domain;
pub mod games;
pub mod harness;
pub mod pipeline;
pub mod systems;
pub mod transport;

// Re-export commonly used types
pub use crate::core::{
    ClientCommandId, Command, CommandType, Event, EventTypeId, MatchRng, MatchRngState,
    MatchState, PlayerId, PlayerMap, SystemState,
};

pub use crate::domain::{DomainCore, ValidationError};

pub use crate::pipeline::{Pipeline, PipelineOutcome};

pub use crate::systems::{
    compute_delta, Cardinality, EventStream, EventStreamEntry, Interaction, InteractionId,
    InteractionKind, InteractionKindConfig, InteractionRegistry, StreamDelta, CURSOR_START,
};

pub use crate::adjudication::{
    should_force_cancel, AdjudicationDecision, KeepReason, MatchMetadata, PlayerConnection,
};

pub use crate::transport::{
    execute_batch, AnimationMode, BatchAction, BatchingConfig, CommandBatcher,
    CommandDeterminism, CommandEnvelope, CommandReceipt, CommandStatus, LatencyConfig, MatchHost,
    MatchId, OptimisticExecutor, PredictionOutcome, ReconcileOutcome, ServerResponse,
};

pub use crate::harness::{replay, ReplayResult, ScenarioRunner, StepReport};
