//! Property tests: replay determinism, batch equivalence, cursor coverage.

use proptest::prelude::*;

use matchsync::games::duel::{DuelGame, DuelGameBuilder};
use matchsync::harness::replay;
use matchsync::{
    compute_delta, execute_batch, Command, CommandType, Event, EventStream, EventTypeId,
    MatchRng, Pipeline, PlayerId, CURSOR_START,
};

fn pipeline() -> Pipeline<DuelGame> {
    let (game, registry) = DuelGameBuilder::new().build();
    Pipeline::new(game, registry)
}

/// Arbitrary duel commands, legal and illegal alike: rejected commands are
/// no-ops and interaction responses may be stale - the engine must stay
/// deterministic through all of it.
fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        (0..2u8).prop_map(|p| Command::new(DuelGame::DRAW, PlayerId::new(p))),
        (0..2u8, 0..4i64, 0..2i64).prop_map(|(p, index, target)| {
            Command::with_args(DuelGame::STRIKE, PlayerId::new(p), &[index, target])
        }),
        (0..2u8).prop_map(|p| Command::new(DuelGame::PASS, PlayerId::new(p))),
        (0..2u8, 0..2i64, 1..=3i64).prop_map(|(p, target, count)| {
            Command::with_args(DuelGame::PURGE, PlayerId::new(p), &[target, count])
        }),
        (0..2u8, 0..6i64, 1..=5i64).prop_map(|(p, id, pick)| {
            Command::with_args(
                CommandType::INTERACTION_RESPOND,
                PlayerId::new(p),
                &[id, pick],
            )
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Replaying the same script against the same seed twice yields
    /// byte-identical state and event logs.
    #[test]
    fn replay_same_script_is_byte_identical(
        seed in any::<u64>(),
        script in proptest::collection::vec(arb_command(), 0..40),
    ) {
        let pipeline = pipeline();

        let first = replay(&pipeline, 2, seed, &script);
        let second = replay(&pipeline, 2, seed, &script);

        prop_assert_eq!(first.core_bytes, second.core_bytes);
        prop_assert_eq!(first.events, second.events);
        prop_assert_eq!(first.state, second.state);
    }

    /// Batch execution is equivalent to serial single-command calls that
    /// stop at the first failure - not a separate execution mode.
    #[test]
    fn batch_equals_serial_single_calls(
        seed in any::<u64>(),
        script in proptest::collection::vec(arb_command(), 0..20),
    ) {
        let pipeline = pipeline();

        let mut batch_rng = MatchRng::new(seed);
        let batch_initial = pipeline.create_match(2, &mut batch_rng);
        let batch = execute_batch(&pipeline, &batch_initial, &script, &mut batch_rng);

        let mut serial_rng = MatchRng::new(seed);
        let mut serial_state = pipeline.create_match(2, &mut serial_rng);
        let mut applied = 0usize;
        for command in &script {
            match pipeline.execute(&serial_state, command, &mut serial_rng) {
                Ok(outcome) => {
                    serial_state = outcome.state;
                    applied += 1;
                }
                Err(_) => break,
            }
        }

        prop_assert_eq!(&batch.state, &serial_state);
        prop_assert_eq!(batch.applied_count(), applied);
    }

    /// A cursor consuming in arbitrary chunks sees every entry exactly
    /// once, in order, with no resets on a growing stream.
    #[test]
    fn cursor_sees_each_entry_exactly_once(
        chunks in proptest::collection::vec(1..5usize, 0..12),
    ) {
        let mut stream = EventStream::new(512);
        let mut cursor = CURSOR_START;
        let mut seen = Vec::new();

        for chunk in chunks {
            for _ in 0..chunk {
                stream.append(Event::new(EventTypeId::new(1)));
            }
            let delta = compute_delta(stream.entries(), cursor);
            prop_assert!(!delta.should_reset);
            seen.extend(delta.new_entries.iter().map(|e| e.id));
            cursor = delta.next_last_seen_id;
        }

        let expected: Vec<i64> = (1..=seen.len() as i64).collect();
        prop_assert_eq!(seen, expected);
    }

    /// Rejected commands never leave partial effects: a failing script
    /// prefix leaves the state exactly where the last success put it.
    #[test]
    fn rejections_leave_no_partial_effects(
        seed in any::<u64>(),
        script in proptest::collection::vec(arb_command(), 0..20),
    ) {
        let pipeline = pipeline();
        let mut rng = MatchRng::new(seed);
        let mut state = pipeline.create_match(2, &mut rng);

        for command in &script {
            let before = state.clone();
            match pipeline.execute(&state, command, &mut rng) {
                Ok(outcome) => {
                    if outcome.is_noop() {
                        prop_assert_eq!(&outcome.state, &before);
                    }
                    state = outcome.state;
                }
                Err(_) => {
                    // The caller keeps the input state untouched.
                    prop_assert_eq!(&state, &before);
                }
            }
        }
    }
}
