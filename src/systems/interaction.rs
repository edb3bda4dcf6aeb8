//! Interaction system: pause match progress for exactly one player decision.
//!
//! An interaction is a mid-pipeline request for one player's input ("choose
//! a card", "respond to an attack"). The engine guarantees at most one
//! pending interaction per match; a request made while another is pending
//! degrades to a system error event and the first request survives.
//!
//! ## Operations
//!
//! Both spec-level operations are expressed as events flowing through the
//! pipeline:
//! - queueing: an [`EventTypeId::INTERACTION_REQUESTED`] event, emitted by a
//!   domain reducer; the system assigns a monotonic id and generates the
//!   option set when the event folds.
//! - resolving: the reserved `CommandType::INTERACTION_RESPOND` command;
//!   [`check_response`] validates it against the pending interaction and the
//!   pipeline turns it into an `INTERACTION_RESOLVED` event.
//!
//! ## Lazy option generation
//!
//! Option sets are produced by generator functions registered per
//! interaction kind, evaluated against the *current* core state - at
//! creation for display, and again at resolution for validation. A chain of
//! two interactions created from one trigger therefore never offers an
//! already-consumed choice: by the time the second request folds, the first
//! resolution has already been reduced into the core.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::event::{sys_error, Event, EventTypeId};
use crate::core::state::SystemState;
use crate::core::{Command, MatchState, PlayerId};
use crate::domain::ValidationError;

use super::{EngineSystem, HookVerdict};

/// Interaction kind identifier. Games define what kinds exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionKind(pub u16);

impl InteractionKind {
    /// Create a new interaction kind ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Monotonically assigned interaction identifier.
///
/// The join key between a request and its eventual response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InteractionId(pub u64);

impl InteractionId {
    /// Create a new interaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Encode for event/command argument slots.
    #[must_use]
    pub const fn encode(self) -> i64 {
        self.0 as i64
    }
}

/// Selection count constraint for multi-select interactions.
///
/// A response with a selection count outside `min..=max` is rejected as
/// invalid, never silently clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    /// Minimum number of selected options.
    pub min: usize,
    /// Maximum number of selected options.
    pub max: usize,
}

impl Cardinality {
    /// Exactly one selection.
    #[must_use]
    pub const fn single() -> Self {
        Self { min: 1, max: 1 }
    }

    /// Exactly `n` selections.
    #[must_use]
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    /// Between `min` and `max` selections inclusive.
    #[must_use]
    pub const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Check whether a selection count satisfies the constraint.
    #[must_use]
    pub const fn contains(self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::single()
    }
}

/// A pending request for one player's input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Monotonic id, the join key with the eventual response.
    pub id: InteractionId,

    /// The registered kind.
    pub kind: InteractionKind,

    /// The player being prompted.
    pub player: PlayerId,

    /// Option values generated at creation, for display. Validation always
    /// regenerates against the live state instead of trusting this list.
    pub options: Vec<i64>,

    /// Selection count constraint.
    pub cardinality: Cardinality,

    /// Whether this interaction holds the response-window lock.
    pub exclusive: bool,
}

/// Engine-owned interaction state inside [`SystemState`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    /// The pending interaction, if any. At most one per match.
    pub current: Option<Interaction>,

    /// Next interaction id to assign.
    next_id: u64,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            current: None,
            next_id: 1,
        }
    }
}

impl InteractionState {
    /// Allocate the next monotonic interaction id.
    pub fn allocate_id(&mut self) -> InteractionId {
        let id = InteractionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Check whether an interaction is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }
}

/// Option set generator: a pure function of the current core state.
///
/// Stored by reference so option sets are recomputed lazily, never baked in
/// at interaction creation.
pub type OptionsGenerator<C> = Arc<dyn Fn(&C, PlayerId) -> Vec<i64> + Send + Sync>;

/// Startup configuration for one interaction kind.
pub struct InteractionKindConfig<C> {
    /// The kind this config describes.
    pub kind: InteractionKind,

    /// Human-readable name (for debugging/display).
    pub name: String,

    /// Option set generator, evaluated against the current core state.
    options: OptionsGenerator<C>,

    /// Selection count constraint.
    pub cardinality: Cardinality,

    /// Whether this kind takes the response-window lock while pending.
    pub exclusive: bool,
}

impl<C> InteractionKindConfig<C> {
    /// Create a new kind configuration.
    pub fn new(
        kind: InteractionKind,
        name: impl Into<String>,
        options: impl Fn(&C, PlayerId) -> Vec<i64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            options: Arc::new(options),
            cardinality: Cardinality::single(),
            exclusive: true,
        }
    }

    /// Set the selection count constraint (builder pattern).
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Mark this kind as non-exclusive: it never takes the response-window
    /// lock, so adjudication will not force-cancel it (builder pattern).
    #[must_use]
    pub fn advisory(mut self) -> Self {
        self.exclusive = false;
        self
    }

    /// Generate the option set against the given core state.
    #[must_use]
    pub fn generate_options(&self, core: &C, player: PlayerId) -> Vec<i64> {
        (self.options)(core, player)
    }
}

impl<C> Clone for InteractionKindConfig<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            name: self.name.clone(),
            options: Arc::clone(&self.options),
            cardinality: self.cardinality,
            exclusive: self.exclusive,
        }
    }
}

impl<C> std::fmt::Debug for InteractionKindConfig<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionKindConfig")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .field("exclusive", &self.exclusive)
            .finish_non_exhaustive()
    }
}

/// Immutable lookup table of interaction kinds, built once at startup and
/// passed into pipeline construction. No ambient global state.
#[derive(Clone, Debug)]
pub struct InteractionRegistry<C> {
    kinds: FxHashMap<InteractionKind, InteractionKindConfig<C>>,
}

impl<C> Default for InteractionRegistry<C> {
    fn default() -> Self {
        Self {
            kinds: FxHashMap::default(),
        }
    }
}

impl<C> InteractionRegistry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind configuration (builder pattern).
    #[must_use]
    pub fn with_kind(mut self, config: InteractionKindConfig<C>) -> Self {
        self.kinds.insert(config.kind, config);
        self
    }

    /// Register a kind configuration.
    pub fn register(&mut self, config: InteractionKindConfig<C>) {
        self.kinds.insert(config.kind, config);
    }

    /// Look up a kind configuration.
    #[must_use]
    pub fn get(&self, kind: InteractionKind) -> Option<&InteractionKindConfig<C>> {
        self.kinds.get(&kind)
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Outcome of checking a response command against the pending interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseCheck {
    /// The response no longer matches the live pending interaction. A race,
    /// not a fault: the response is discarded without touching state.
    Stale(&'static str),

    /// The response is valid; the interaction carries freshly regenerated
    /// options and `selection` has passed cardinality and membership checks.
    Valid {
        /// The pending interaction with its option set regenerated against
        /// the current core state.
        interaction: Interaction,
        /// The validated selection.
        selection: Vec<i64>,
    },
}

/// Validate a `CommandType::INTERACTION_RESPOND` command.
///
/// `args[0]` must match the pending interaction's id and the submitting
/// player must be the prompted player; any mismatch is [`ResponseCheck::Stale`].
/// The selection (`args[1..]`) is checked against the cardinality constraint
/// and against the option set regenerated from the live state - both produce
/// hard validation errors, never silent clamping.
pub fn check_response<C>(
    registry: &InteractionRegistry<C>,
    state: &MatchState<C>,
    command: &Command,
) -> Result<ResponseCheck, ValidationError> {
    let Some(current) = &state.sys.interaction.current else {
        return Ok(ResponseCheck::Stale("no_pending_interaction"));
    };

    if command.arg(0, -1) != current.id.encode() {
        return Ok(ResponseCheck::Stale("interaction_id_mismatch"));
    }
    if command.player != current.player {
        return Ok(ResponseCheck::Stale("player_mismatch"));
    }

    let Some(config) = registry.get(current.kind) else {
        // A pending interaction of an unregistered kind can only mean the
        // registry changed under a live match; treat as stale.
        return Ok(ResponseCheck::Stale("unknown_interaction_kind"));
    };

    let options = config.generate_options(&state.core, current.player);
    let selection: Vec<i64> = command.args.iter().skip(1).copied().collect();

    if !current.cardinality.contains(selection.len()) {
        return Err(ValidationError::SelectionCardinality {
            got: selection.len(),
            min: current.cardinality.min,
            max: current.cardinality.max,
        });
    }
    for (i, value) in selection.iter().enumerate() {
        if selection[..i].contains(value) {
            return Err(ValidationError::DuplicateSelection { value: *value });
        }
        if !options.contains(value) {
            return Err(ValidationError::UnknownOption { value: *value });
        }
    }

    Ok(ResponseCheck::Valid {
        interaction: Interaction {
            options,
            ..current.clone()
        },
        selection,
    })
}

/// Engine system enforcing the at-most-one-pending invariant and gating
/// commands while an interaction is pending.
#[derive(Clone, Debug)]
pub struct InteractionSystem<C> {
    registry: Arc<InteractionRegistry<C>>,
}

impl<C> InteractionSystem<C> {
    /// Create the system over a shared kind registry.
    #[must_use]
    pub fn new(registry: Arc<InteractionRegistry<C>>) -> Self {
        Self { registry }
    }
}

impl<C> EngineSystem<C> for InteractionSystem<C> {
    fn name(&self) -> &'static str {
        "interaction"
    }

    fn on_command(
        &self,
        state: &MatchState<C>,
        command: &Command,
        events: &mut Vec<Event>,
    ) -> HookVerdict {
        // While an interaction is pending, only the prompted player (and
        // engine-reserved commands) may proceed.
        if let Some(current) = &state.sys.interaction.current {
            if !command.command_type.is_reserved() && command.player != current.player {
                return HookVerdict::Veto("interaction_pending");
            }
        }

        // Walk the candidate events in fold order, tracking whether an
        // interaction will be pending at each point. A request that would
        // exceed capacity degrades to a system error event; the pending
        // interaction is never clobbered.
        let mut pending = state.sys.interaction.is_pending();
        for event in events.iter_mut() {
            match event.event_type {
                EventTypeId::INTERACTION_RESOLVED | EventTypeId::INTERACTION_CANCELLED => {
                    pending = false;
                }
                EventTypeId::INTERACTION_REQUESTED => {
                    let kind = InteractionKind(event.value(0, 0) as u16);
                    if self.registry.get(kind).is_none() {
                        warn!(kind = kind.raw(), "interaction request for unknown kind");
                        *event = Event::system_error(sys_error::UNKNOWN_INTERACTION_KIND, event.player);
                    } else if pending {
                        debug!(kind = kind.raw(), "interaction request while one pending");
                        *event =
                            Event::system_error(sys_error::INTERACTION_ALREADY_PENDING, event.player);
                    } else {
                        pending = true;
                    }
                }
                _ => {}
            }
        }

        HookVerdict::Continue
    }

    fn apply(&self, sys: &mut SystemState, core: &C, event: &Event) {
        match event.event_type {
            EventTypeId::INTERACTION_REQUESTED => {
                if sys.interaction.current.is_some() {
                    // The command hook rewrites over-capacity requests, so
                    // this only fires if a hook was bypassed.
                    warn!("interaction request folded while one pending; ignored");
                    return;
                }
                let kind = InteractionKind(event.value(0, 0) as u16);
                let (Some(config), Some(player)) = (self.registry.get(kind), event.player) else {
                    return;
                };
                let id = sys.interaction.allocate_id();
                let options = config.generate_options(core, player);
                sys.interaction.current = Some(Interaction {
                    id,
                    kind,
                    player,
                    options,
                    cardinality: config.cardinality,
                    exclusive: config.exclusive,
                });
            }
            EventTypeId::INTERACTION_RESOLVED | EventTypeId::INTERACTION_CANCELLED => {
                sys.interaction.current = None;
            }
            _ => {}
        }
    }
}
