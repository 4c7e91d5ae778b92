/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [`Clerk`], the client stub that replicas and their clients use to talk to the view service.
//!
//! Every call opens a fresh connection, sends one request, and waits for one reply. A call that cannot be
//! completed returns an [`RpcError`]; the clerk never retries on its own, since replicas are expected to
//! keep pinging every interval anyway.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::types::{Address, View, ViewNumber};

use super::messages::{Ping, ViewServiceRequest, ViewServiceResponse};
use super::stream::{read_frame, write_frame, FrameError};

/// Default bound on connecting to, writing to, and reading from the view service.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct Clerk {
    me: Address,
    server: SocketAddr,
    timeout: Duration,
}

impl Clerk {
    /// Create a clerk for the replica (or client) named `me`, talking to the view service at `server`.
    pub fn new(me: impl Into<Address>, server: SocketAddr) -> Self {
        Self {
            me: me.into(),
            server,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn me(&self) -> &Address {
        &self.me
    }

    /// Heartbeat: tell the service that this replica is alive and has adopted `view_number`. Returns the view
    /// the replica should adopt next.
    pub fn ping(&self, view_number: ViewNumber) -> Result<View, RpcError> {
        let request = ViewServiceRequest::from(Ping {
            me: self.me.clone(),
            view_number,
        });
        Ok(self.call(request)?.view().clone())
    }

    /// Fetch the active view without heartbeating.
    pub fn get(&self) -> Result<View, RpcError> {
        Ok(self.call(ViewServiceRequest::Get)?.view().clone())
    }

    /// The primary of the active view, or `None` if there is none or the service could not be reached.
    pub fn primary(&self) -> Option<Address> {
        match self.get() {
            Ok(view) => view.primary,
            Err(err) => {
                log::debug!("{} could not fetch the view from {}: {}", self.me, self.server, err);
                None
            }
        }
    }

    fn call(&self, request: ViewServiceRequest) -> Result<ViewServiceResponse, RpcError> {
        let mut stream =
            TcpStream::connect_timeout(&self.server, self.timeout).map_err(RpcError::Connect)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;

        write_frame(&mut stream, &request)?;
        let response: ViewServiceResponse = read_frame(&mut stream)?;
        if !response.answers(&request) {
            return Err(RpcError::UnexpectedResponse);
        }
        Ok(response)
    }
}

/// Enumerates the ways an RPC to the view service can fail.
#[derive(Debug)]
pub enum RpcError {
    /// The service could not be reached.
    Connect(io::Error),

    /// Configuring the connection failed.
    Io(io::Error),

    /// See: [`FrameError`].
    Frame(FrameError),

    /// The service replied with a response for a different kind of request.
    UnexpectedResponse,
}

impl From<io::Error> for RpcError {
    fn from(value: io::Error) -> Self {
        RpcError::Io(value)
    }
}

impl From<FrameError> for RpcError {
    fn from(value: FrameError) -> Self {
        RpcError::Frame(value)
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Connect(err) => write!(f, "failed to connect: {}", err),
            RpcError::Io(err) => write!(f, "failed to configure connection: {}", err),
            RpcError::Frame(err) => write!(f, "{}", err),
            RpcError::UnexpectedResponse => write!(f, "unexpected response"),
        }
    }
}

impl std::error::Error for RpcError {}
