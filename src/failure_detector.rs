/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The failure detector: a thread that calls [`ViewServiceState::tick`] once per ping interval.
//!
//! Every tick, each role that is occupied in the active view has its [`PeerTimer`] incremented. Pings from
//! the occupant reset the timer (see [`crate::heartbeat`]). When a timer reaches the configured number of
//! dead pings, the occupant is presumed dead and a view without it is proposed and installed:
//! - Primary timeout: the backup is promoted to primary, and the backup slot is cleared.
//! - Backup timeout: the primary stays, and the backup slot is cleared.
//!
//! An eviction only happens if the primary has acknowledged the active view. Otherwise a transition is
//! already in flight, and the timer is reset without evicting anyone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crate::events::{Event, PeerTimeoutEvent};
use crate::state::{lock, SharedState, ViewServiceState};
use crate::types::{Address, Role, View};

/// Miss counter for one role.
///
/// The timer remembers which replica it is counting for. If the role changes hands between two ticks, the
/// count starts again from zero for the new occupant.
#[derive(Debug, Default)]
pub struct PeerTimer {
    occupant: Option<Address>,
    missed: u32,
}

impl PeerTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `occupant` was heard from.
    pub fn reset(&mut self, occupant: &Address) {
        self.occupant = Some(occupant.clone());
        self.missed = 0;
    }

    /// `occupant` was not heard from during the last interval. Returns the number of consecutive
    /// intervals missed.
    pub fn miss(&mut self, occupant: &Address) -> u32 {
        if self.occupant.as_ref() != Some(occupant) {
            self.occupant = Some(occupant.clone());
            self.missed = 0;
        }
        self.missed += 1;
        self.missed
    }

    pub fn missed(&self) -> u32 {
        self.missed
    }
}

impl ViewServiceState {
    /// Run one failure detection interval. Roles are checked one after the other, primary first, each against
    /// the active view as it stands when it is checked.
    pub fn tick(&mut self) {
        self.check_role(Role::Primary);
        self.check_role(Role::Backup);
    }

    fn check_role(&mut self, role: Role) {
        let active = self.store.active().clone();
        let occupant = match active.occupant(role) {
            Some(occupant) => occupant.clone(),
            None => return,
        };

        let missed = self.timer_mut(role).miss(&occupant);
        if missed < self.dead_pings {
            return;
        }

        let acked = self.store.acked_view_number();
        let evicted = acked == active.view_number;
        Event::PeerTimeout(PeerTimeoutEvent {
            timestamp: SystemTime::now(),
            peer: occupant.clone(),
            role,
            missed,
            evicted,
        })
        .publish(&self.event_publisher);

        if evicted {
            let view_number = self.next_view_number();
            let view = match role {
                Role::Primary => View::new(view_number, active.backup.clone(), None),
                Role::Backup => View::new(view_number, active.primary.clone(), None),
            };
            if self.propose(view) {
                self.advance(acked);
            }
        }

        self.timer_mut(role).reset(&occupant);
    }
}

/// Spawn the failure detector thread, which ticks `state` every `ping_interval` until `shutdown_signal`
/// fires, its sender is dropped, or the service is marked `dead`.
///
/// `dead` is read with the state lock held, and is only ever set with the lock held, so no tick runs once
/// the flag is observable.
pub(crate) fn start_failure_detector(
    state: SharedState,
    ping_interval: Duration,
    dead: Arc<AtomicBool>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        {
            let mut state = lock(&state);
            if dead.load(Ordering::SeqCst) {
                return;
            }
            state.tick();
        }

        match shutdown_signal.recv_timeout(ping_interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => (),
        }
    })
}
