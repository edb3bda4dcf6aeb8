//! Static latency-optimization policy, declared once per game.
//!
//! The policy classifies each command type for the transport layer:
//! whether the client may predict it locally, how predicted events drive
//! animation, and how submissions are batched. Immutable at runtime.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::CommandType;

/// Whether a command's outcome is a pure function of visible state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandDeterminism {
    /// Pure function of visible state; safe to predict locally.
    Deterministic,

    /// Depends on server-owned randomness or hidden information; must never
    /// be predicted.
    Nondeterministic,
}

/// How predicted events drive animation on the client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationMode {
    /// Keep predicted event-stream entries: animations start immediately.
    Optimistic,

    /// Strip predicted entries; animations wait for server confirmation.
    #[default]
    WaitConfirm,
}

/// Client-side batching policy.
#[derive(Clone, Debug)]
pub struct BatchingConfig {
    /// Whether submissions are collected into batches at all.
    pub enabled: bool,

    /// Queue length that forces a flush.
    pub max_batch_size: usize,

    /// Command types that flush the queue immediately when enqueued.
    pub immediate: FxHashSet<CommandType>,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_batch_size: 8,
            immediate: FxHashSet::default(),
        }
    }
}

impl BatchingConfig {
    /// Enabled batching with the given flush threshold.
    #[must_use]
    pub fn enabled(max_batch_size: usize) -> Self {
        Self {
            enabled: true,
            max_batch_size: max_batch_size.max(1),
            immediate: FxHashSet::default(),
        }
    }

    /// Mark a command type as flush-immediately (builder pattern).
    #[must_use]
    pub fn with_immediate(mut self, command_type: CommandType) -> Self {
        self.immediate.insert(command_type);
        self
    }
}

/// Per-game, per-command-type transport policy.
///
/// Command types without an explicit determinism declaration are probed at
/// prediction time: if the local pipeline run draws from the RNG, the
/// prediction is discarded.
#[derive(Clone, Debug, Default)]
pub struct LatencyConfig {
    determinism: FxHashMap<CommandType, CommandDeterminism>,
    animation: FxHashMap<CommandType, AnimationMode>,
    /// Batching policy.
    pub batching: BatchingConfig,
}

impl LatencyConfig {
    /// Create an empty policy: every command probed, every animation
    /// wait-confirm, batching disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a command type's determinism (builder pattern).
    #[must_use]
    pub fn declare(mut self, command_type: CommandType, determinism: CommandDeterminism) -> Self {
        self.determinism.insert(command_type, determinism);
        self
    }

    /// Declare a command type's animation mode (builder pattern).
    #[must_use]
    pub fn animate(mut self, command_type: CommandType, mode: AnimationMode) -> Self {
        self.animation.insert(command_type, mode);
        self
    }

    /// Set the batching policy (builder pattern).
    #[must_use]
    pub fn with_batching(mut self, batching: BatchingConfig) -> Self {
        self.batching = batching;
        self
    }

    /// Explicit determinism declaration, if any. `None` means "probe".
    #[must_use]
    pub fn determinism_of(&self, command_type: CommandType) -> Option<CommandDeterminism> {
        self.determinism.get(&command_type).copied()
    }

    /// Animation mode for a command type; undeclared types wait for
    /// confirmation.
    #[must_use]
    pub fn animation_of(&self, command_type: CommandType) -> AnimationMode {
        self.animation
            .get(&command_type)
            .copied()
            .unwrap_or_default()
    }
}
