/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of view service events for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published by the
//! threads that mutate or serve the view service state, and consumed on the event bus thread, which passes
//! them to the handlers registered on the [`ViewServerSpec`](crate::view_server::ViewServerSpec) and, if
//! enabled, to the default [loggers](crate::logging).

use std::net::SocketAddr;
use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::{Address, Role, View, ViewNumber};

pub enum Event {
    // Lifecycle events.
    StartServer(StartServerEvent),
    StopServer(StopServerEvent),
    // Events that involve receiving a heartbeat.
    ReceivePing(ReceivePingEvent),
    PrimaryRestart(PrimaryRestartEvent),
    // Events that change the view history.
    ProposeView(ProposeViewEvent),
    AdvanceView(AdvanceViewEvent),
    // Failure detector events.
    PeerTimeout(PeerTimeoutEvent),
}

impl Event {
    /// Send the event to the event bus, if there is one. Events published after the bus has shut down are
    /// dropped.
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// The service bound its listening socket and started serving.
pub struct StartServerEvent {
    pub timestamp: SystemTime,
    pub listening_addr: SocketAddr,
}

/// The service was killed.
pub struct StopServerEvent {
    pub timestamp: SystemTime,
}

/// A replica pinged the service.
pub struct ReceivePingEvent {
    pub timestamp: SystemTime,
    pub origin: Address,
    pub view_number: ViewNumber,
}

/// The active primary pinged with view number 0, i.e., it restarted and lost its state.
pub struct PrimaryRestartEvent {
    pub timestamp: SystemTime,
    pub primary: Address,
    pub active_view_number: ViewNumber,
}

/// A new view was appended to the view history.
pub struct ProposeViewEvent {
    pub timestamp: SystemTime,
    pub view: View,
}

/// The active cursor moved forward, so `view` is now served to replicas and clients.
pub struct AdvanceViewEvent {
    pub timestamp: SystemTime,
    pub view: View,
    pub acked_view_number: ViewNumber,
}

/// The replica holding `role` in the active view missed `missed` consecutive intervals. `evicted` is false
/// when the eviction was held back because the active view had not been acknowledged yet.
pub struct PeerTimeoutEvent {
    pub timestamp: SystemTime,
    pub peer: Address,
    pub role: Role,
    pub missed: u32,
    pub evicted: bool,
}
