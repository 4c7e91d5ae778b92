/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the server's
//! [configuration](crate::view_server::Configuration).
//!
//! The view service logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [AdvanceView](crate::events::AdvanceViewEvent) is printed:
//!
//! ```text
//! AdvanceView, 1701329264, 2, 10.0.0.1:7000, 10.0.0.2:7000, 1
//! ```
//!
//! In the snippet, the third to fifth values are the view number, primary, and backup of the view that
//! became active, and the sixth value is the acknowledged view number. Empty roles print as `-`.

use std::time::SystemTime;

use crate::events::*;
use crate::types::Address;

// Names of each event in PascalCase for printing:
pub const START_SERVER: &str = "StartServer";
pub const STOP_SERVER: &str = "StopServer";
pub const RECEIVE_PING: &str = "ReceivePing";
pub const PRIMARY_RESTART: &str = "PrimaryRestart";
pub const PROPOSE_VIEW: &str = "ProposeView";
pub const ADVANCE_VIEW: &str = "AdvanceView";
pub const PEER_TIMEOUT: &str = "PeerTimeout";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for StartServerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |start_server_event: &StartServerEvent| {
            log::info!(
                "{}, {}, {}",
                START_SERVER,
                secs_since_unix_epoch(start_server_event.timestamp),
                start_server_event.listening_addr
            )
        };
        Box::new(logger)
    }
}

impl Logger for StopServerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |stop_server_event: &StopServerEvent| {
            log::info!(
                "{}, {}",
                STOP_SERVER,
                secs_since_unix_epoch(stop_server_event.timestamp)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceivePingEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        // Pings arrive every interval from every replica, so they go out at debug level.
        let logger = |receive_ping_event: &ReceivePingEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                RECEIVE_PING,
                secs_since_unix_epoch(receive_ping_event.timestamp),
                receive_ping_event.origin,
                receive_ping_event.view_number
            )
        };
        Box::new(logger)
    }
}

impl Logger for PrimaryRestartEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |primary_restart_event: &PrimaryRestartEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PRIMARY_RESTART,
                secs_since_unix_epoch(primary_restart_event.timestamp),
                primary_restart_event.primary,
                primary_restart_event.active_view_number
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_view_event: &ProposeViewEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PROPOSE_VIEW,
                secs_since_unix_epoch(propose_view_event.timestamp),
                propose_view_event.view.view_number,
                or_dash(&propose_view_event.view.primary),
                or_dash(&propose_view_event.view.backup)
            )
        };
        Box::new(logger)
    }
}

impl Logger for AdvanceViewEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |advance_view_event: &AdvanceViewEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                ADVANCE_VIEW,
                secs_since_unix_epoch(advance_view_event.timestamp),
                advance_view_event.view.view_number,
                or_dash(&advance_view_event.view.primary),
                or_dash(&advance_view_event.view.backup),
                advance_view_event.acked_view_number
            )
        };
        Box::new(logger)
    }
}

impl Logger for PeerTimeoutEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |peer_timeout_event: &PeerTimeoutEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                PEER_TIMEOUT,
                secs_since_unix_epoch(peer_timeout_event.timestamp),
                peer_timeout_event.peer,
                peer_timeout_event.role,
                peer_timeout_event.missed,
                peer_timeout_event.evicted
            )
        };
        Box::new(logger)
    }
}

fn or_dash(addr: &Option<Address>) -> &str {
    addr.as_ref().map_or("-", Address::as_str)
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
