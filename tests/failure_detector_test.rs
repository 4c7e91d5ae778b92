//! Tests for the failure detector, driven by calling [`ViewServiceState::tick`] directly.

use viewservice::{
    failure_detector::PeerTimer,
    state::{ViewServiceState, DEFAULT_DEAD_PINGS},
    types::Role,
};

mod common;

use common::state::{acked_pair, addr, ping, tick_n, view, vn, A, B, C};

#[test]
fn peer_timer_restarts_when_the_role_changes_hands() {
    let mut timer = PeerTimer::new();
    assert_eq!(timer.miss(&addr(A)), 1);
    assert_eq!(timer.miss(&addr(A)), 2);
    assert_eq!(timer.miss(&addr(B)), 1);

    timer.reset(&addr(B));
    assert_eq!(timer.missed(), 0);
}

#[test]
fn primary_is_replaced_after_dead_pings_intervals() {
    let mut state = acked_pair(A, B);

    for _ in 0..DEFAULT_DEAD_PINGS - 1 {
        ping(&mut state, B, 2);
        state.tick();
    }
    assert_eq!(state.get(), view(2, Some(A), Some(B)));

    ping(&mut state, B, 2);
    state.tick();
    assert_eq!(state.get(), view(3, Some(B), None));
    assert_eq!(state.missed_pings(Role::Primary), 0);
}

#[test]
fn dead_backup_is_dropped_from_the_view() {
    let mut state = acked_pair(A, B);

    for _ in 0..DEFAULT_DEAD_PINGS {
        ping(&mut state, A, 2);
        state.tick();
    }
    assert_eq!(state.get(), view(3, Some(A), None));
}

#[test]
fn eviction_waits_for_the_primary_to_acknowledge() {
    let mut state = ViewServiceState::new(DEFAULT_DEAD_PINGS);
    ping(&mut state, A, 0);

    tick_n(&mut state, DEFAULT_DEAD_PINGS * 3);
    assert_eq!(state.get(), view(1, Some(A), None));
    assert_eq!(state.proposed(), view(1, Some(A), None));
}

#[test]
fn empty_roles_are_not_counted() {
    let mut state = ViewServiceState::new(DEFAULT_DEAD_PINGS);
    tick_n(&mut state, DEFAULT_DEAD_PINGS * 2);
    assert_eq!(state.missed_pings(Role::Primary), 0);
    assert_eq!(state.missed_pings(Role::Backup), 0);
    assert_eq!(state.get(), view(0, None, None));

    ping(&mut state, A, 0);
    ping(&mut state, A, 1);
    tick_n(&mut state, 3);
    assert_eq!(state.missed_pings(Role::Primary), 3);
    assert_eq!(state.missed_pings(Role::Backup), 0);
}

#[test]
fn promoted_backup_starts_with_a_fresh_counter() {
    let mut state = acked_pair(A, B);
    tick_n(&mut state, DEFAULT_DEAD_PINGS - 1);
    assert_eq!(state.missed_pings(Role::Backup), DEFAULT_DEAD_PINGS - 1);

    ping(&mut state, B, 2);
    state.tick();
    assert_eq!(state.get(), view(3, Some(B), None));

    state.tick();
    assert_eq!(state.missed_pings(Role::Primary), 1);
    assert_eq!(state.get(), view(3, Some(B), None));
}

#[test]
fn both_replicas_timing_out_promotes_the_backup_only_once() {
    let mut state = acked_pair(A, B);

    tick_n(&mut state, DEFAULT_DEAD_PINGS);
    assert_eq!(state.get(), view(3, Some(B), None));

    // B never acknowledged view 3, so it cannot be evicted in turn.
    tick_n(&mut state, DEFAULT_DEAD_PINGS * 4);
    assert_eq!(state.get(), view(3, Some(B), None));
    assert_eq!(state.acked_view_number(), vn(2));
}

#[test]
fn new_backup_is_recruited_after_failover() {
    let mut state = acked_pair(A, B);

    for _ in 0..DEFAULT_DEAD_PINGS {
        ping(&mut state, B, 2);
        state.tick();
    }
    assert_eq!(ping(&mut state, B, 2), view(3, Some(B), None));
    assert_eq!(ping(&mut state, B, 3), view(3, Some(B), None));

    assert_eq!(ping(&mut state, C, 0), view(4, Some(B), Some(C)));
    assert_eq!(state.acked_view_number(), vn(3));
}
