/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The heartbeat handler: what the view service does when a replica pings it.
//!
//! A ping reports the caller's address and the view number it last adopted. It both keeps the caller's
//! miss counter at zero and drives the view transitions that do not involve a timeout. The decision is made
//! against the *active* view:
//!
//! 1. **No primary and no backup.** If the caller knows the active view number (on a fresh service: it
//!    pings with 0), it becomes the primary of the next view, with no backup. This view is installed
//!    immediately, since there is no previous primary that has to learn about it first.
//! 2. **The caller is the primary, pinging with a view number at least the active one.** This is an
//!    acknowledgement. If a proposal is outstanding, it becomes the active view.
//! 3. **The caller is the primary, pinging with view number 0.** The primary restarted and lost its state.
//!    If the active view is acknowledged, the backup is promoted and the backup slot is cleared.
//! 4. **The caller is not the primary, and the latest proposed view has no backup.** The caller becomes
//!    the backup of a new view. The new view becomes active at once if the active view is acknowledged,
//!    otherwise on the primary's next acknowledgement.
//! 5. **Anything else.** No change; the caller is simply told the active view.

use std::time::SystemTime;

use crate::events::{Event, PrimaryRestartEvent, ReceivePingEvent};
use crate::state::ViewServiceState;
use crate::types::{Address, View, ViewNumber};

impl ViewServiceState {
    /// The `Ping` RPC. Returns the active view, which the caller should adopt.
    pub fn ping(&mut self, caller: Address, caller_view_number: ViewNumber) -> View {
        Event::ReceivePing(ReceivePingEvent {
            timestamp: SystemTime::now(),
            origin: caller.clone(),
            view_number: caller_view_number,
        })
        .publish(&self.event_publisher);

        let active = self.store.active().clone();
        match &active.primary {
            None => {
                if active.backup.is_none() && caller_view_number == active.view_number {
                    if self.propose(View::new(self.next_view_number(), Some(caller.clone()), None)) {
                        self.advance(ViewNumber::init());
                    }
                }
            }

            Some(primary) if *primary == caller => {
                if caller_view_number >= active.view_number {
                    self.advance(caller_view_number);
                } else if caller_view_number.is_init() {
                    self.on_primary_restart(&active);
                }
            }

            Some(_) => {
                if self.store.proposed().backup.is_none() {
                    let proposed = self.propose(View::new(
                        self.next_view_number(),
                        active.primary.clone(),
                        Some(caller.clone()),
                    ));
                    if proposed && self.store.acked_view_number() == active.view_number {
                        self.advance(self.store.acked_view_number());
                    }
                }
            }
        }

        let role = self.store.active().role_of(&caller);
        if let Some(role) = role {
            self.timer_mut(role).reset(&caller);
        }

        self.store.active().clone()
    }

    fn on_primary_restart(&mut self, active: &View) {
        if let Some(primary) = &active.primary {
            Event::PrimaryRestart(PrimaryRestartEvent {
                timestamp: SystemTime::now(),
                primary: primary.clone(),
                active_view_number: active.view_number,
            })
            .publish(&self.event_publisher);
        }

        let acked = self.store.acked_view_number();
        if acked == active.view_number {
            if self.propose(View::new(active.view_number + 1, active.backup.clone(), None)) {
                self.advance(acked);
            }
        }
    }
}
