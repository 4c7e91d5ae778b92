/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A view service for primary/backup replication.
//!
//! The view service is a single coordinating process that decides which of the replicas pinging it is the
//! primary and which is the backup. Each such assignment is a [view](types::View), identified by a view
//! number that only ever increases. Replicas ping the service every interval; the service uses the pings
//! both to detect failed replicas and to learn when the primary has adopted the current view, and it never
//! moves past a view until the primary has acknowledged it. This keeps two replicas from acting as primary
//! at the same time.
//!
//! The main entry points are:
//! - [`view_server::ViewServerSpec`], to configure and start a service,
//! - [`networking::client::Clerk`], to ping and query a running service, and
//! - [`state::ViewServiceState`], the state machine itself, which can also be driven directly.

pub mod types;

pub mod view_store;

pub mod state;

pub mod heartbeat;

pub mod failure_detector;

pub mod networking;

pub mod view_server;

pub mod events;

pub(crate) mod event_bus;

pub mod logging;
