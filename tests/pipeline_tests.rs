//! Pipeline integration tests using the duel demo game.

use matchsync::games::duel::{DuelGame, DuelGameBuilder};
use matchsync::{
    compute_delta, Command, CommandType, EventTypeId, MatchRng, Pipeline, PlayerId,
    ValidationError, CURSOR_START,
};

fn pipeline() -> Pipeline<DuelGame> {
    let (game, registry) = DuelGameBuilder::new().build();
    Pipeline::new(game, registry)
}

#[test]
fn test_execute_produces_events_and_streams_them() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let strike = Command::with_args(DuelGame::STRIKE, PlayerId::new(0), &[0, 1]);
    let outcome = pipeline.execute(&state, &strike, &mut rng).unwrap();

    assert_eq!(outcome.events.len(), 2);
    assert_eq!(outcome.state.sys.command_seq, 1);

    let ids: Vec<_> = outcome
        .state
        .sys
        .event_stream
        .entries()
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);

    // Events carry the logical timestamp and the source command.
    for event in &outcome.events {
        assert_eq!(event.timestamp, 1);
        assert_eq!(event.source_command, Some(DuelGame::STRIKE));
    }
}

#[test]
fn test_rejected_command_changes_nothing() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let off_turn = Command::new(DuelGame::PASS, PlayerId::new(1));
    let err = pipeline.execute(&state, &off_turn, &mut rng).unwrap_err();

    assert_eq!(
        err,
        ValidationError::NotPlayersTurn {
            player: PlayerId::new(1)
        }
    );
    // The caller keeps the input state; nothing was streamed.
    assert!(state.sys.event_stream.is_empty());
    assert_eq!(state.sys.command_seq, 0);
}

#[test]
fn test_unknown_command_rejected() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let bogus = Command::new(CommandType::new(77), PlayerId::new(0));
    assert!(pipeline.execute(&state, &bogus, &mut rng).is_err());
}

#[test]
fn test_interaction_gates_other_players() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let purge = Command::with_args(DuelGame::PURGE, PlayerId::new(0), &[1, 1]);
    let state = pipeline.execute(&state, &purge, &mut rng).unwrap().state;
    assert!(state.sys.interaction.is_pending());

    // The caster is not the prompted player: their next command is vetoed
    // to a no-op, not an error.
    let pass = Command::new(DuelGame::PASS, PlayerId::new(0));
    let outcome = pipeline.execute(&state, &pass, &mut rng).unwrap();

    assert!(outcome.is_noop());
    assert_eq!(outcome.state, state);
}

#[test]
fn test_chained_discards_regenerate_options() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let purge = Command::with_args(DuelGame::PURGE, PlayerId::new(0), &[1, 2]);
    let state = pipeline.execute(&state, &purge, &mut rng).unwrap().state;

    let first = state.sys.interaction.current.clone().unwrap();
    assert_eq!(first.player, PlayerId::new(1));
    let expected: Vec<i64> = {
        let mut hand = state.core.hands[PlayerId::new(1)].clone();
        hand.sort_unstable();
        hand.dedup();
        hand
    };
    assert_eq!(first.options, expected);

    // Resolve the first discard; the domain chains the second prompt.
    let pick = first.options[0];
    let respond = Command::with_args(
        CommandType::INTERACTION_RESPOND,
        PlayerId::new(1),
        &[first.id.encode(), pick],
    );
    let state = pipeline.execute(&state, &respond, &mut rng).unwrap().state;

    let second = state.sys.interaction.current.clone().unwrap();
    assert!(second.id.raw() > first.id.raw(), "ids are monotonic");

    // The second prompt's options were generated after the first discard
    // was folded into the core: exactly the remaining hand.
    let expected: Vec<i64> = {
        let mut hand = state.core.hands[PlayerId::new(1)].clone();
        hand.sort_unstable();
        hand.dedup();
        hand
    };
    assert_eq!(second.options, expected);
    assert_eq!(state.core.pending_discards, 1);

    // Resolve the second; the chain ends.
    let pick = second.options[0];
    let respond = Command::with_args(
        CommandType::INTERACTION_RESPOND,
        PlayerId::new(1),
        &[second.id.encode(), pick],
    );
    let state = pipeline.execute(&state, &respond, &mut rng).unwrap().state;

    assert!(!state.sys.interaction.is_pending());
    assert_eq!(state.core.pending_discards, 0);
    assert_eq!(state.core.hands[PlayerId::new(1)].len(), 1);
}

#[test]
fn test_game_over_rejects_further_commands() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let mut state = pipeline.create_match(2, &mut rng);

    // Player 0 strikes until player 1 drops, drawing when the hand runs dry.
    let mut guard = 0;
    while !state.sys.game_over {
        let attacker = PlayerId::new(state.core.active);
        let command = if state.core.hands[attacker].is_empty() {
            Command::new(DuelGame::DRAW, attacker)
        } else {
            Command::with_args(DuelGame::STRIKE, attacker, &[0, 1])
        };
        state = pipeline.execute(&state, &command, &mut rng).unwrap().state;
        guard += 1;
        assert!(guard < 200, "match should end");
    }

    let command = Command::new(DuelGame::PASS, PlayerId::new(state.core.active));
    assert_eq!(
        pipeline.execute(&state, &command, &mut rng).unwrap_err(),
        ValidationError::GameOver
    );
}

#[test]
fn test_restore_snapshot_is_a_compensating_state() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let initial = pipeline.create_match(2, &mut rng);

    let strike = Command::with_args(DuelGame::STRIKE, PlayerId::new(0), &[0, 1]);
    let after = pipeline.execute(&initial, &strike, &mut rng).unwrap().state;
    assert_eq!(after.sys.undo.len(), 1);

    let restored = pipeline.restore_snapshot(&after).unwrap();

    // The core is back; the event stream is a fresh generation with a
    // rewound id sequence.
    assert_eq!(restored.core, initial.core);
    assert!(restored.sys.event_stream.is_empty());
    assert_eq!(restored.sys.event_stream.next_id(), 1);
    assert_eq!(restored.sys.command_seq, 0);
    assert!(restored.sys.undo.is_empty());

    // A consumer that had seen the pre-undo entries observes a reset.
    let cursor = after.sys.event_stream.last_id().unwrap();
    let delta = compute_delta(restored.sys.event_stream.entries(), cursor);
    assert!(delta.should_reset);
    assert_eq!(delta.next_last_seen_id, CURSOR_START);
}

#[test]
fn test_reserved_commands_take_no_snapshot() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let purge = Command::with_args(DuelGame::PURGE, PlayerId::new(0), &[1, 1]);
    let state = pipeline.execute(&state, &purge, &mut rng).unwrap().state;
    assert_eq!(state.sys.undo.len(), 1);

    let pending = state.sys.interaction.current.clone().unwrap();
    let respond = Command::with_args(
        CommandType::INTERACTION_RESPOND,
        PlayerId::new(1),
        &[pending.id.encode(), pending.options[0]],
    );
    let state = pipeline.execute(&state, &respond, &mut rng).unwrap().state;

    // The response is engine-internal; undo granularity stays per player
    // command.
    assert_eq!(state.sys.undo.len(), 1);
}

#[test]
fn test_system_events_reach_the_stream() {
    let pipeline = pipeline();
    let mut rng = MatchRng::new(42);
    let state = pipeline.create_match(2, &mut rng);

    let purge = Command::with_args(DuelGame::PURGE, PlayerId::new(0), &[1, 1]);
    let state = pipeline.execute(&state, &purge, &mut rng).unwrap().state;

    let types: Vec<_> = state
        .sys
        .event_stream
        .entries()
        .iter()
        .map(|e| e.event.event_type)
        .collect();
    assert_eq!(
        types,
        vec![DuelGame::PURGE_CALLED, EventTypeId::INTERACTION_REQUESTED]
    );
}
