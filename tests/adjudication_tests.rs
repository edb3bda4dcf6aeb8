//! Disconnect adjudication wired through the match host.

use std::sync::Arc;

use matchsync::games::duel::{DuelGame, DuelGameBuilder};
use matchsync::{
    Command, EventTypeId, KeepReason, MatchHost, MatchId, Pipeline, PlayerId,
};

fn host_with_match() -> (MatchHost<DuelGame>, MatchId) {
    let (game, registry) = DuelGameBuilder::new().build();
    let mut host = MatchHost::new(Arc::new(Pipeline::new(game, registry)));
    let match_id = host.create_match(2, 42);
    (host, match_id)
}

fn purge(host: &mut MatchHost<DuelGame>, match_id: MatchId) {
    let response = host
        .submit_batch(
            match_id,
            &[Command::with_args(DuelGame::PURGE, PlayerId::new(0), &[1, 1])],
        )
        .unwrap();
    assert!(response.results[0].status.is_applied());
    assert!(host.state(match_id).unwrap().sys.interaction.is_pending());
}

#[test]
fn test_unknown_connection_state_counts_as_connected() {
    let (mut host, match_id) = host_with_match();
    purge(&mut host, match_id);

    // Nobody reported a connection change yet: leave the prompt alone.
    let decision = host.adjudicate(match_id, PlayerId::new(1));

    assert!(!decision.should_cancel);
    assert_eq!(decision.reason, Some(KeepReason::PlayerConnected));
    assert!(host.state(match_id).unwrap().sys.interaction.is_pending());
}

#[test]
fn test_disconnected_prompted_player_is_cancelled() {
    let (mut host, match_id) = host_with_match();
    purge(&mut host, match_id);
    host.set_connected(match_id, PlayerId::new(1), false);

    let decision = host.adjudicate(match_id, PlayerId::new(1));

    assert!(decision.should_cancel);
    let state = host.state(match_id).unwrap();
    assert!(!state.sys.interaction.is_pending());
    assert_eq!(state.sys.response_window.pending_interaction_id, None);

    // The cancellation is an ordinary event in the canonical stream.
    let last = state.sys.event_stream.entries().back().unwrap();
    assert_eq!(last.event.event_type, EventTypeId::INTERACTION_CANCELLED);
}

#[test]
fn test_disconnected_non_prompted_player_is_kept() {
    let (mut host, match_id) = host_with_match();
    purge(&mut host, match_id);
    host.set_connected(match_id, PlayerId::new(0), false);

    // The caster disconnected, but the prompt belongs to player 1.
    let decision = host.adjudicate(match_id, PlayerId::new(0));

    assert!(!decision.should_cancel);
    assert_eq!(decision.reason, Some(KeepReason::InteractionOwnerMismatch));
    assert!(host.state(match_id).unwrap().sys.interaction.is_pending());
}

#[test]
fn test_disconnect_without_pending_interaction() {
    let (mut host, match_id) = host_with_match();
    host.set_connected(match_id, PlayerId::new(1), false);

    let decision = host.adjudicate(match_id, PlayerId::new(1));

    assert!(!decision.should_cancel);
    assert_eq!(decision.reason, Some(KeepReason::NoPendingInteraction));
}

#[test]
fn test_reconnect_before_adjudication_keeps_prompt() {
    let (mut host, match_id) = host_with_match();
    purge(&mut host, match_id);

    host.set_connected(match_id, PlayerId::new(1), false);
    host.set_connected(match_id, PlayerId::new(1), true);

    let decision = host.adjudicate(match_id, PlayerId::new(1));

    assert!(!decision.should_cancel);
    assert_eq!(decision.reason, Some(KeepReason::PlayerConnected));
}

#[test]
fn test_unknown_match_is_missing_state() {
    let (mut host, _match_id) = host_with_match();

    let decision = host.adjudicate(MatchId::new(99), PlayerId::new(0));

    assert!(!decision.should_cancel);
    assert_eq!(decision.reason, Some(KeepReason::MissingState));
}

#[test]
fn test_match_resumes_after_forced_cancellation() {
    let (mut host, match_id) = host_with_match();
    purge(&mut host, match_id);
    host.set_connected(match_id, PlayerId::new(1), false);
    host.adjudicate(match_id, PlayerId::new(1));

    // The gate lifted with the prompt: player 0 can act again.
    let response = host
        .submit_batch(match_id, &[Command::new(DuelGame::PASS, PlayerId::new(0))])
        .unwrap();
    assert!(response.results[0].status.is_applied());
    assert_eq!(host.state(match_id).unwrap().core.active, 1);
}
