//! Latency-optimized transport: two cooperating halves sharing one
//! per-game [`LatencyConfig`].
//!
//! The client half predicts deterministic commands locally for immediate
//! rendering and reconciles against canonical confirmations; the server
//! half executes submissions (single or batched) strictly serially through
//! the same pipeline. Global ordering per match equals event-stream id
//! order; no reordering or parallel application within one match.

pub mod batch;
pub mod config;
pub mod optimistic;
pub mod server;
pub mod wire;

pub use batch::{execute_batch, BatchAction, BatchOutcome, CommandBatcher};
pub use config::{AnimationMode, BatchingConfig, CommandDeterminism, LatencyConfig};
pub use optimistic::{OptimisticExecutor, PredictionOutcome, ReconcileOutcome};
pub use server::MatchHost;
pub use wire::{CommandEnvelope, CommandReceipt, CommandStatus, MatchId, ServerResponse};
