//! Randomized test of the safety properties of view transitions.
//!
//! Three replicas ping, crash, restart, and recover in a random order while the failure detector ticks. After
//! every step, the test checks that:
//! 1. A view number, once served, always names the same primary and backup.
//! 2. The served view number never decreases, and increases by at most one per step.
//! 3. The service only moves past a view with a primary once that primary has acknowledged it.
//! 4. A new primary always comes from the previous view.
//! 5. No replica is both primary and backup.
//! 6. Reading the view does not change it.

use std::collections::HashMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use viewservice::{
    state::{ViewServiceState, DEFAULT_DEAD_PINGS},
    types::{Address, View, ViewNumber},
};

mod common;

use common::state::{addr, A, B, C};

const STEPS_PER_RUN: usize = 3000;

struct Replica {
    addr: Address,
    alive: bool,
    view_number: ViewNumber,
}

impl Replica {
    fn new(name: &str) -> Self {
        Self {
            addr: addr(name),
            alive: true,
            view_number: ViewNumber::init(),
        }
    }
}

enum Step {
    Ping(usize),
    Restart(usize),
    Crash(usize),
    Recover(usize),
    Tick,
}

fn random_step(rng: &mut StdRng, replicas: usize) -> Step {
    let replica = rng.gen_range(0, replicas);
    match rng.gen_range(0, 100) {
        0..=54 => Step::Ping(replica),
        55..=59 => Step::Restart(replica),
        60..=63 => Step::Crash(replica),
        64..=69 => Step::Recover(replica),
        _ => Step::Tick,
    }
}

fn apply(state: &mut ViewServiceState, replicas: &mut [Replica], step: &Step) {
    match *step {
        Step::Ping(i) if replicas[i].alive => {
            let replica = &mut replicas[i];
            let view = state.ping(replica.addr.clone(), replica.view_number);
            replica.view_number = view.view_number;
        }
        Step::Restart(i) => {
            let replica = &mut replicas[i];
            replica.alive = true;
            replica.view_number = ViewNumber::init();
            let view = state.ping(replica.addr.clone(), replica.view_number);
            replica.view_number = view.view_number;
        }
        Step::Crash(i) => replicas[i].alive = false,
        Step::Recover(i) => replicas[i].alive = true,
        Step::Tick => state.tick(),
        Step::Ping(_) => (),
    }
}

fn check_step(before: &View, after: &View, acked_after: ViewNumber, served: &mut HashMap<ViewNumber, View>) {
    assert!(after.view_number >= before.view_number, "view number went back from {} to {}", before, after);
    assert!(
        after.view_number.int() - before.view_number.int() <= 1,
        "skipped a view going from {} to {}",
        before,
        after
    );

    if after != before {
        assert!(
            before.primary.is_none() || acked_after == before.view_number,
            "moved past {} to {} before its primary acknowledged it",
            before,
            after
        );
        if before.primary.is_some() {
            assert!(
                after.primary.is_none() || after.primary == before.primary || after.primary == before.backup,
                "{} has a primary that was not in {}",
                after,
                before
            );
        }
    }

    if let (Some(primary), Some(backup)) = (&after.primary, &after.backup) {
        assert_ne!(primary, backup, "{} has the same replica in both roles", after);
    }

    let first_served = served.entry(after.view_number).or_insert_with(|| after.clone());
    assert_eq!(&*first_served, after, "view number {} was reused", after.view_number);
}

fn run(seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = ViewServiceState::new(DEFAULT_DEAD_PINGS);
    let mut replicas = vec![Replica::new(A), Replica::new(B), Replica::new(C)];
    let mut served = HashMap::new();

    for _ in 0..STEPS_PER_RUN {
        let before = state.get();
        let step = random_step(&mut rng, replicas.len());
        apply(&mut state, &mut replicas, &step);
        let after = state.get();

        check_step(&before, &after, state.acked_view_number(), &mut served);
        assert_eq!(state.get(), after);
    }
}

#[test]
fn random_schedules_preserve_view_safety() {
    for seed in 0..20 {
        run(seed);
    }
}

#[test]
fn random_schedules_make_progress() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut state = ViewServiceState::new(DEFAULT_DEAD_PINGS);
    let mut replicas = vec![Replica::new(A), Replica::new(B), Replica::new(C)];

    for _ in 0..STEPS_PER_RUN {
        let step = random_step(&mut rng, replicas.len());
        apply(&mut state, &mut replicas, &step);
    }

    assert!(state.get().view_number > ViewNumber::new(1), "stuck at {}", state.get());
}
