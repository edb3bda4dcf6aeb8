//! Duel: a small demonstration domain exercising every engine feature.
//!
//! Players hold hands of power cards. On your turn you may draw a random
//! card (server randomness - never predicted), strike an opponent with a
//! card (deterministic - predicted optimistically), pass the turn, or call
//! a purge that forces an opponent through a chain of single-card discard
//! prompts (the interaction protocol).
//!
//! Used by the test harness and the integration tests; also a worked
//! example of the [`DomainCore`] contract.

use serde::{Deserialize, Serialize};

use crate::core::{Command, CommandType, Event, EventTypeId, MatchRng, PlayerId, PlayerMap};
use crate::domain::{DomainCore, ValidationError};
use crate::systems::interaction::{
    Interaction, InteractionKind, InteractionKindConfig, InteractionRegistry,
};
use crate::transport::{AnimationMode, BatchingConfig, CommandDeterminism, LatencyConfig};

/// Maximum hand size; draws beyond it are rejected.
const MAX_HAND: usize = 10;

/// Duel core state. Fully owned by the game, opaque to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelCore {
    /// Life totals per seat.
    pub life: PlayerMap<i64>,

    /// Hands of card power values per seat.
    pub hands: PlayerMap<Vec<i64>>,

    /// Seat whose turn it is.
    pub active: u8,

    /// Discards still owed to the current purge.
    pub pending_discards: i64,

    /// Seat being purged, if any.
    pub discard_target: Option<u8>,
}

impl DuelCore {
    fn hand(&self, player: PlayerId) -> &[i64] {
        self.hands.get(player).map_or(&[], |hand| hand.as_slice())
    }

    fn is_seat(&self, seat: i64) -> bool {
        seat >= 0 && (seat as usize) < self.life.player_count()
    }
}

/// The duel rules.
#[derive(Clone, Debug)]
pub struct DuelGame {
    starting_life: i64,
    hand_size: usize,
    latency: LatencyConfig,
}

impl DuelGame {
    /// Draw a random card. `args`: none. Server-owned randomness.
    pub const DRAW: CommandType = CommandType::new(0);
    /// Strike an opponent. `args`: `[hand_index, target_seat]`.
    pub const STRIKE: CommandType = CommandType::new(1);
    /// Pass the turn. `args`: none.
    pub const PASS: CommandType = CommandType::new(2);
    /// Force discards. `args`: `[target_seat, count]`.
    pub const PURGE: CommandType = CommandType::new(3);

    /// A card entered a hand. `values`: `[power]`.
    pub const CARD_DRAWN: EventTypeId = EventTypeId::new(0);
    /// A card left the attacker's hand. `values`: `[hand_index, power]`.
    pub const CARD_PLAYED: EventTypeId = EventTypeId::new(1);
    /// Life lost. `player` = victim, `values`: `[amount]`.
    pub const DAMAGE_DEALT: EventTypeId = EventTypeId::new(2);
    /// The turn moved on. `player` = who passed.
    pub const TURN_PASSED: EventTypeId = EventTypeId::new(3);
    /// A purge began. `values`: `[target_seat, count]`.
    pub const PURGE_CALLED: EventTypeId = EventTypeId::new(4);
    /// A card was discarded. `player` = discarder, `values`: `[power]`.
    pub const CARD_DISCARDED: EventTypeId = EventTypeId::new(5);

    /// The discard prompt kind.
    pub const DISCARD_CHOICE: InteractionKind = InteractionKind::new(0);

    fn not_your_turn(&self, core: &DuelCore, player: PlayerId) -> Result<(), ValidationError> {
        if core.active as usize != player.index() {
            return Err(ValidationError::NotPlayersTurn { player });
        }
        Ok(())
    }
}

/// Builder for a [`DuelGame`] plus its interaction registry.
pub struct DuelGameBuilder {
    starting_life: i64,
    hand_size: usize,
}

impl Default for DuelGameBuilder {
    fn default() -> Self {
        Self {
            starting_life: 20,
            hand_size: 3,
        }
    }
}

impl DuelGameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_life(mut self, life: i64) -> Self {
        self.starting_life = life;
        self
    }

    pub fn hand_size(mut self, size: usize) -> Self {
        assert!(size <= MAX_HAND, "hand size must fit in a hand");
        self.hand_size = size;
        self
    }

    /// Build the game and its interaction registry.
    pub fn build(self) -> (DuelGame, InteractionRegistry<DuelCore>) {
        let latency = LatencyConfig::new()
            .declare(DuelGame::STRIKE, CommandDeterminism::Deterministic)
            .declare(DuelGame::PASS, CommandDeterminism::Deterministic)
            .declare(DuelGame::DRAW, CommandDeterminism::Nondeterministic)
            // PURGE stays undeclared: the randomness probe classifies it.
            .animate(DuelGame::STRIKE, AnimationMode::Optimistic)
            .with_batching(BatchingConfig::enabled(4).with_immediate(DuelGame::PURGE));

        let game = DuelGame {
            starting_life: self.starting_life,
            hand_size: self.hand_size,
            latency,
        };

        let registry = InteractionRegistry::new().with_kind(InteractionKindConfig::new(
            DuelGame::DISCARD_CHOICE,
            "DiscardChoice",
            |core: &DuelCore, player| {
                let mut options = core.hand(player).to_vec();
                options.sort_unstable();
                options.dedup();
                options
            },
        ));

        (game, registry)
    }
}

impl DomainCore for DuelGame {
    type State = DuelCore;

    fn setup(&self, player_count: usize, rng: &mut MatchRng) -> DuelCore {
        let mut hands: PlayerMap<Vec<i64>> = PlayerMap::with_default(player_count);
        for player in PlayerId::all(player_count) {
            hands[player] = (0..self.hand_size).map(|_| rng.roll(5)).collect();
        }
        DuelCore {
            life: PlayerMap::with_value(player_count, self.starting_life),
            hands,
            active: 0,
            pending_discards: 0,
            discard_target: None,
        }
    }

    fn validate(&self, core: &DuelCore, command: &Command) -> Result<(), ValidationError> {
        match command.command_type {
            DuelGame::DRAW => {
                self.not_your_turn(core, command.player)?;
                if core.hand(command.player).len() >= MAX_HAND {
                    return Err(ValidationError::rejected(command.command_type, "hand is full"));
                }
                Ok(())
            }
            DuelGame::STRIKE => {
                self.not_your_turn(core, command.player)?;
                let index = command.arg(0, -1);
                let target = command.arg(1, -1);
                if index < 0 || index as usize >= core.hand(command.player).len() {
                    return Err(ValidationError::rejected(command.command_type, "no such card"));
                }
                if !core.is_seat(target) || target as usize == command.player.index() {
                    return Err(ValidationError::rejected(command.command_type, "bad target"));
                }
                Ok(())
            }
            DuelGame::PASS => self.not_your_turn(core, command.player),
            DuelGame::PURGE => {
                self.not_your_turn(core, command.player)?;
                let target = command.arg(0, -1);
                let count = command.arg(1, 0);
                if !core.is_seat(target) || target as usize == command.player.index() {
                    return Err(ValidationError::rejected(command.command_type, "bad target"));
                }
                if !(1..=3).contains(&count) {
                    return Err(ValidationError::rejected(command.command_type, "bad count"));
                }
                if core.hand(PlayerId::new(target as u8)).is_empty() {
                    return Err(ValidationError::rejected(
                        command.command_type,
                        "nothing to discard",
                    ));
                }
                Ok(())
            }
            other => Err(ValidationError::rejected(other, "unknown command")),
        }
    }

    fn execute(&self, core: &DuelCore, command: &Command, rng: &mut MatchRng) -> Vec<Event> {
        match command.command_type {
            DuelGame::DRAW => {
                let power = rng.roll(5);
                vec![Event::for_player(DuelGame::CARD_DRAWN, command.player).with_value(power)]
            }
            DuelGame::STRIKE => {
                let index = command.arg(0, 0);
                let target = PlayerId::new(command.arg(1, 0) as u8);
                let power = core.hand(command.player)[index as usize];
                vec![
                    Event::for_player(DuelGame::CARD_PLAYED, command.player)
                        .with_value(index)
                        .with_value(power),
                    Event::for_player(DuelGame::DAMAGE_DEALT, target).with_value(power),
                ]
            }
            DuelGame::PASS => {
                vec![Event::for_player(DuelGame::TURN_PASSED, command.player)]
            }
            DuelGame::PURGE => {
                let target = PlayerId::new(command.arg(0, 0) as u8);
                let count = command.arg(1, 1);
                vec![
                    Event::for_player(DuelGame::PURGE_CALLED, command.player)
                        .with_value(target.index() as i64)
                        .with_value(count),
                    Event::interaction_requested(i64::from(DuelGame::DISCARD_CHOICE.raw()), target),
                ]
            }
            _ => Vec::new(),
        }
    }

    fn reduce(&self, core: &DuelCore, event: &Event) -> DuelCore {
        let mut next = core.clone();
        let player = event.player.unwrap_or(PlayerId::new(0));

        match event.event_type {
            DuelGame::CARD_DRAWN => {
                if let Some(hand) = next.hands.get_mut(player) {
                    hand.push(event.value(0, 0));
                }
            }
            DuelGame::CARD_PLAYED => {
                let index = event.value(0, 0) as usize;
                if let Some(hand) = next.hands.get_mut(player) {
                    if index < hand.len() {
                        hand.remove(index);
                    }
                }
            }
            DuelGame::DAMAGE_DEALT => {
                if let Some(life) = next.life.get_mut(player) {
                    *life -= event.value(0, 0);
                }
            }
            DuelGame::TURN_PASSED => {
                let players = next.life.player_count() as u8;
                next.active = (next.active + 1) % players.max(1);
            }
            DuelGame::PURGE_CALLED => {
                let target = PlayerId::new(event.value(0, 0) as u8);
                let owed = event.value(1, 1);
                let available = next.hands.get(target).map_or(0, Vec::len) as i64;
                next.pending_discards = owed.min(available);
                next.discard_target = Some(target.0);
            }
            DuelGame::CARD_DISCARDED => {
                let value = event.value(0, 0);
                if let Some(hand) = next.hands.get_mut(player) {
                    if let Some(pos) = hand.iter().position(|&card| card == value) {
                        hand.remove(pos);
                    }
                }
                next.pending_discards = (next.pending_discards - 1).max(0);
                if next.pending_discards == 0 {
                    next.discard_target = None;
                }
            }
            _ => {}
        }

        next
    }

    fn on_interaction_resolved(
        &self,
        core: &DuelCore,
        interaction: &Interaction,
        selection: &[i64],
        _rng: &mut MatchRng,
    ) -> Vec<Event> {
        if interaction.kind != DuelGame::DISCARD_CHOICE {
            return Vec::new();
        }

        let mut events: Vec<Event> = selection
            .iter()
            .map(|&value| {
                Event::for_player(DuelGame::CARD_DISCARDED, interaction.player).with_value(value)
            })
            .collect();

        // Chain the next prompt while discards are still owed and the hand
        // has cards left to give.
        let remaining = core.pending_discards - selection.len() as i64;
        let hand_left = core.hand(interaction.player).len() as i64 - selection.len() as i64;
        if remaining > 0 && hand_left > 0 {
            events.push(Event::interaction_requested(
                i64::from(DuelGame::DISCARD_CHOICE.raw()),
                interaction.player,
            ));
        }

        events
    }

    fn is_game_over(&self, core: &DuelCore) -> bool {
        core.life.iter().any(|(_, &life)| life <= 0)
    }

    fn latency_config(&self) -> &LatencyConfig {
        &self.latency
    }
}
