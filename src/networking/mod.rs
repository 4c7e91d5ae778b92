/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The view service's RPC surface over TCP: wire messages, framing, the server, and the client stub.

pub mod client;

pub mod messages;

pub(crate) mod server;

pub mod stream;
