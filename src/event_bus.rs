/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The event bus thread, which receives [events](crate::events) from the rest of the service and fires the
//! handlers registered for them.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// How long the bus waits for an event before checking for shutdown again.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct EventHandlers {
    pub(crate) start_server_handlers: Vec<HandlerPtr<StartServerEvent>>,
    pub(crate) stop_server_handlers: Vec<HandlerPtr<StopServerEvent>>,
    pub(crate) receive_ping_handlers: Vec<HandlerPtr<ReceivePingEvent>>,
    pub(crate) primary_restart_handlers: Vec<HandlerPtr<PrimaryRestartEvent>>,
    pub(crate) propose_view_handlers: Vec<HandlerPtr<ProposeViewEvent>>,
    pub(crate) advance_view_handlers: Vec<HandlerPtr<AdvanceViewEvent>>,
    pub(crate) peer_timeout_handlers: Vec<HandlerPtr<PeerTimeoutEvent>>,
}

impl EventHandlers {
    /// Collect the user-registered handlers, and, if `log_events` is set, the default logger of every
    /// event type.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        on_start_server: Option<HandlerPtr<StartServerEvent>>,
        on_stop_server: Option<HandlerPtr<StopServerEvent>>,
        on_receive_ping: Option<HandlerPtr<ReceivePingEvent>>,
        on_primary_restart: Option<HandlerPtr<PrimaryRestartEvent>>,
        on_propose_view: Option<HandlerPtr<ProposeViewEvent>>,
        on_advance_view: Option<HandlerPtr<AdvanceViewEvent>>,
        on_peer_timeout: Option<HandlerPtr<PeerTimeoutEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            start_server_handlers: handlers(log_events, on_start_server),
            stop_server_handlers: handlers(log_events, on_stop_server),
            receive_ping_handlers: handlers(log_events, on_receive_ping),
            primary_restart_handlers: handlers(log_events, on_primary_restart),
            propose_view_handlers: handlers(log_events, on_propose_view),
            advance_view_handlers: handlers(log_events, on_advance_view),
            peer_timeout_handlers: handlers(log_events, on_peer_timeout),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start_server_handlers.is_empty()
            && self.stop_server_handlers.is_empty()
            && self.receive_ping_handlers.is_empty()
            && self.primary_restart_handlers.is_empty()
            && self.propose_view_handlers.is_empty()
            && self.advance_view_handlers.is_empty()
            && self.peer_timeout_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::StartServer(start_server_event) =>
                self.start_server_handlers.iter().for_each(|handler| handler(&start_server_event)),

            Event::StopServer(stop_server_event) =>
                self.stop_server_handlers.iter().for_each(|handler| handler(&stop_server_event)),

            Event::ReceivePing(receive_ping_event) =>
                self.receive_ping_handlers.iter().for_each(|handler| handler(&receive_ping_event)),

            Event::PrimaryRestart(primary_restart_event) =>
                self.primary_restart_handlers.iter().for_each(|handler| handler(&primary_restart_event)),

            Event::ProposeView(propose_view_event) =>
                self.propose_view_handlers.iter().for_each(|handler| handler(&propose_view_event)),

            Event::AdvanceView(advance_view_event) =>
                self.advance_view_handlers.iter().for_each(|handler| handler(&advance_view_event)),

            Event::PeerTimeout(peer_timeout_event) =>
                self.peer_timeout_handlers.iter().for_each(|handler| handler(&peer_timeout_event)),
        }
    }
}

fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    handlers.extend(user_handler);
    handlers
}

/// Spawn the event bus thread. On shutdown, events that were already published are still handled before
/// the thread exits, so that the final [`StopServerEvent`] is not lost.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.fire_handlers(event)
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
