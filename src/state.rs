/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The state block shared by every thread of a running view service.
//!
//! [`ViewServiceState`] bundles the [`ViewStore`] with the per-role [`PeerTimer`]s of the failure detector.
//! Its three entry points are:
//! 1. [`ping`](ViewServiceState::ping), the heartbeat handler (defined in [`crate::heartbeat`]),
//! 2. [`tick`](ViewServiceState::tick), the failure detector (defined in [`crate::failure_detector`]), and
//! 3. [`get`](ViewServiceState::get), the query handler.
//!
//! A running server wraps the state in a single [`Mutex`] ([`SharedState`]). Every entry point, including
//! the read-only `get`, runs with that mutex held, so all three are totally ordered and a `get` never
//! observes a half-applied transition.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::events::{AdvanceViewEvent, Event, ProposeViewEvent};
use crate::failure_detector::PeerTimer;
use crate::types::{Role, View, ViewNumber};
use crate::view_store::ViewStore;

/// Number of consecutive missed ping intervals after which a replica is considered dead.
pub const DEFAULT_DEAD_PINGS: u32 = 5;

/// Handle through which the RPC handlers and the failure detector thread share one [`ViewServiceState`].
pub type SharedState = Arc<Mutex<ViewServiceState>>;

/// Lock the shared state. A handler that panicked while holding the lock leaves the state consistent
/// (every mutation is a single `propose` or `advance`), so poisoning is ignored.
pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, ViewServiceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ViewServiceState {
    pub(crate) store: ViewStore,
    pub(crate) primary_timer: PeerTimer,
    pub(crate) backup_timer: PeerTimer,
    pub(crate) dead_pings: u32,
    pub(crate) event_publisher: Option<Sender<Event>>,
}

impl ViewServiceState {
    /// Create the state of a fresh service, serving view 0. A replica is declared dead after `dead_pings`
    /// consecutive [`tick`](Self::tick)s without a ping from it.
    pub fn new(dead_pings: u32) -> Self {
        Self::with_event_publisher(dead_pings, None)
    }

    pub(crate) fn with_event_publisher(dead_pings: u32, event_publisher: Option<Sender<Event>>) -> Self {
        Self {
            store: ViewStore::new(),
            primary_timer: PeerTimer::new(),
            backup_timer: PeerTimer::new(),
            dead_pings,
            event_publisher,
        }
    }

    /// The `Get` RPC: the view currently served.
    pub fn get(&self) -> View {
        self.store.active().clone()
    }

    /// The latest proposed view, which may not have become active yet.
    pub fn proposed(&self) -> View {
        self.store.proposed().clone()
    }

    pub fn acked_view_number(&self) -> ViewNumber {
        self.store.acked_view_number()
    }

    /// How many consecutive intervals the replica in `role` has missed so far.
    pub fn missed_pings(&self, role: Role) -> u32 {
        self.timer(role).missed()
    }

    pub(crate) fn timer(&self, role: Role) -> &PeerTimer {
        match role {
            Role::Primary => &self.primary_timer,
            Role::Backup => &self.backup_timer,
        }
    }

    pub(crate) fn timer_mut(&mut self, role: Role) -> &mut PeerTimer {
        match role {
            Role::Primary => &mut self.primary_timer,
            Role::Backup => &mut self.backup_timer,
        }
    }

    /// Propose `view`, returning whether it was recorded. Callers only propose when nothing is pending, so a
    /// refusal means a transition rule is broken; it is logged and the view is dropped.
    pub(crate) fn propose(&mut self, view: View) -> bool {
        if let Err(err) = self.store.propose(view.clone()) {
            log::error!("{}", err);
            return false;
        }
        Event::ProposeView(ProposeViewEvent {
            timestamp: SystemTime::now(),
            view,
        })
        .publish(&self.event_publisher);
        true
    }

    pub(crate) fn advance(&mut self, ack: ViewNumber) {
        if self.store.advance(ack) {
            Event::AdvanceView(AdvanceViewEvent {
                timestamp: SystemTime::now(),
                view: self.store.active().clone(),
                acked_view_number: ack,
            })
            .publish(&self.event_publisher);
        }
    }

    /// View number for the next proposal: one past the latest proposed view.
    pub(crate) fn next_view_number(&self) -> ViewNumber {
        self.store.proposed().view_number + 1
    }
}
