/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The accept loop and per-connection handlers of the view service's RPC endpoint.
//!
//! The listener thread accepts TCP connections and spawns one handler thread per connection. A handler
//! serves any number of framed request/response pairs, in order, until the peer closes the connection, an
//! I/O error or timeout occurs, or the peer sends something that does not decode.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::state::{lock, SharedState};

use super::messages::{Ping, ViewServiceRequest, ViewServiceResponse};
use super::stream::{read_frame, write_frame, FrameError};

/// How long the listener sleeps when no connection is waiting, before checking for shutdown again.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Socket parameters applied to every accepted connection.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ConnectionConfig {
    pub(crate) read_timeout: Duration,
    pub(crate) write_timeout: Duration,
}

/// Spawn the listener thread. `listener` must be in non-blocking mode.
///
/// The thread exits when `shutdown_signal` fires or its sender is dropped, closing the listening socket.
/// If accepting fails for any reason other than "no connection waiting", the server marks itself `dead` and
/// stops accepting. Handler threads already running are left to finish on their own.
pub(crate) fn start_listener(
    listener: TcpListener,
    state: SharedState,
    config: ConnectionConfig,
    dead: Arc<AtomicBool>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match listener.accept() {
            Ok((stream, peer_addr)) => {
                if dead.load(Ordering::SeqCst) {
                    continue;
                }
                let state = state.clone();
                thread::spawn(move || serve_connection(stream, peer_addr, state, config));
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(err) if err.kind() == ErrorKind::Interrupted => (),
            Err(err) => {
                log::warn!("view service failed to accept a connection, shutting down: {}", err);
                // Under the state lock, so the failure detector never ticks after the flag is visible.
                let _state = lock(&state);
                dead.store(true, Ordering::SeqCst);
                return;
            }
        }
    })
}

fn serve_connection(mut stream: TcpStream, peer_addr: SocketAddr, state: SharedState, config: ConnectionConfig) {
    // Accepted sockets may inherit non-blocking mode from the listener on some platforms.
    let configured = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_read_timeout(Some(config.read_timeout)))
        .and_then(|()| stream.set_write_timeout(Some(config.write_timeout)))
        .and_then(|()| stream.set_nodelay(true));
    if let Err(err) = configured {
        log::warn!("failed to configure connection from {}: {}", peer_addr, err);
        return;
    }

    loop {
        let request: ViewServiceRequest = match read_frame(&mut stream) {
            Ok(request) => request,
            Err(FrameError::Closed) => return,
            Err(err) => {
                log::debug!("dropping connection from {}: {}", peer_addr, err);
                return;
            }
        };

        let response = dispatch(&state, request);
        if let Err(err) = write_frame(&mut stream, &response) {
            log::debug!("failed to reply to {}: {}", peer_addr, err);
            return;
        }
    }
}

/// Route `request` to the matching handler on `state`. Every handler runs with the state lock held.
pub(crate) fn dispatch(state: &SharedState, request: ViewServiceRequest) -> ViewServiceResponse {
    match request {
        ViewServiceRequest::Ping(Ping { me, view_number }) => {
            ViewServiceResponse::Ping(lock(state).ping(me, view_number))
        }
        ViewServiceRequest::Get => ViewServiceResponse::Get(lock(state).get()),
    }
}
