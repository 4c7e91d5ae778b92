/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, run, and kill a view service.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the server](ViewServerSpec) with:
//!   1. `ViewServerSpec::builder` to construct a `ViewServerSpecBuilder`,
//!   2. The setters of the `ViewServerSpecBuilder`, and
//!   3. The `ViewServerSpecBuilder::build` method to construct a [ViewServerSpec],
//! - The function to [start](ViewServerSpec::start) a [ViewServer] given its specification,
//! - [The type](ViewServer) which keeps the server alive.
//!
//! ## Starting a view server
//!
//! ```no_run
//! use viewservice::view_server::{Configuration, ViewServerSpec};
//!
//! let configuration = Configuration::builder()
//!     .listening_addr("127.0.0.1:7000".parse().unwrap())
//!     .log_events(true)
//!     .build();
//!
//! let server = ViewServerSpec::builder()
//!     .configuration(configuration)
//!     .on_advance_view(|event| println!("now serving view {}", event.view))
//!     .build()
//!     .start()
//!     .expect("failed to start the view service");
//! ```
//!
//! ## Threads
//!
//! A running server owns three kinds of threads:
//! 1. The listener, which accepts connections and spawns a handler thread per connection
//!    ([`crate::networking`]).
//! 2. The failure detector, which ticks the state once per ping interval ([`crate::failure_detector`]).
//! 3. The event bus, if any event handler is registered or `log_events` is set ([`crate::event_bus`]).
//!
//! All of them share one [`ViewServiceState`] behind one mutex.

use std::fmt::{self, Display, Formatter};
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use typed_builder::TypedBuilder;

use crate::event_bus::*;
use crate::events::*;
use crate::failure_detector::start_failure_detector;
use crate::networking::server::{start_listener, ConnectionConfig};
use crate::state::{lock, SharedState, ViewServiceState, DEFAULT_DEAD_PINGS};
use crate::types::View;

/// Stores the user-defined parameters required to start the view service, that is:
/// 1. The socket address to listen on.
/// 2. The ping interval, i.e., how often replicas are expected to ping and how often the failure detector
///    ticks.
/// 3. The number of consecutive missed intervals after which a replica is presumed dead.
/// 4. Read and write timeouts applied to accepted connections.
/// 5. The "Log Events" flag, if set to "true" then events are logged.
///
/// ## Log Events
///
/// The view service logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.listening_addr(...)`

    Optional:
    - `.ping_interval(...)`
    - `.dead_pings(...)`
    - `.read_timeout(...)`
    - `.write_timeout(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the socket address the service listens on. Port 0 picks a free port. Required."))]
    pub listening_addr: SocketAddr,
    #[builder(default = Duration::from_millis(100), setter(doc = "Set the failure detector's tick interval. Defaults to 100ms."))]
    pub ping_interval: Duration,
    #[builder(default = DEFAULT_DEAD_PINGS, setter(doc = "Set how many consecutive missed intervals make a replica dead. Defaults to 5."))]
    pub dead_pings: u32,
    #[builder(default = Duration::from_secs(1), setter(doc = "Set how long a connection may sit idle between requests. Defaults to 1s."))]
    pub read_timeout: Duration,
    #[builder(default = Duration::from_secs(1), setter(doc = "Set how long writing a reply may take. Defaults to 1s."))]
    pub write_timeout: Duration,
    #[builder(default = false, setter(doc = "Enable logging of events? Defaults to false."))]
    pub log_events: bool,
}

/// Stores the configuration and the event handlers required to run the [ViewServer].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ViewServerSpec]. On the builder call the following methods to construct a valid [ViewServerSpec].

    Required:
    - `.configuration(...)`

    Optional:
    - `.on_start_server(...)`
    - `.on_stop_server(...)`
    - `.on_receive_ping(...)`
    - `.on_primary_restart(...)`
    - `.on_propose_view(...)`
    - `.on_advance_view(...)`
    - `.on_peer_timeout(...)`
"))]
pub struct ViewServerSpec {
    // Required parameters
    #[builder(setter(doc = "Set the [configuration](Configuration) of the service. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&StartServerEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StartServerEvent>),
    doc = "Register a handler closure to be invoked after the service starts listening. Optional."))]
    on_start_server: Option<HandlerPtr<StartServerEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&StopServerEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<StopServerEvent>),
    doc = "Register a handler closure to be invoked after the service is killed. Optional."))]
    on_stop_server: Option<HandlerPtr<StopServerEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceivePingEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceivePingEvent>),
    doc = "Register a handler closure to be invoked after the service receives a ping. Optional."))]
    on_receive_ping: Option<HandlerPtr<ReceivePingEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PrimaryRestartEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PrimaryRestartEvent>),
    doc = "Register a handler closure to be invoked after the primary is seen to have restarted. Optional."))]
    on_primary_restart: Option<HandlerPtr<PrimaryRestartEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeViewEvent>),
    doc = "Register a handler closure to be invoked after a new view is proposed. Optional."))]
    on_propose_view: Option<HandlerPtr<ProposeViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&AdvanceViewEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AdvanceViewEvent>),
    doc = "Register a handler closure to be invoked after a new view becomes active. Optional."))]
    on_advance_view: Option<HandlerPtr<AdvanceViewEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PeerTimeoutEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PeerTimeoutEvent>),
    doc = "Register a handler closure to be invoked after a replica misses too many pings. Optional."))]
    on_peer_timeout: Option<HandlerPtr<PeerTimeoutEvent>>,
}

impl ViewServerSpec {
    /// Bind the listening socket, then start all threads and channels associated with running the service,
    /// and return the handles to them in a [ViewServer] struct.
    ///
    /// Failing to bind is the only way starting can fail, and is reported as [`StartError`].
    pub fn start(self) -> Result<ViewServer, StartError> {
        let config = self.configuration;

        let listener = TcpListener::bind(config.listening_addr).map_err(StartError::Bind)?;
        listener.set_nonblocking(true).map_err(StartError::Configure)?;
        let listening_addr = listener.local_addr().map_err(StartError::Configure)?;

        let event_handlers = EventHandlers::new(
            config.log_events,
            self.on_start_server,
            self.on_stop_server,
            self.on_receive_ping,
            self.on_primary_restart,
            self.on_propose_view,
            self.on_advance_view,
            self.on_peer_timeout,
        );

        let (event_publisher, event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_publisher, event_subscriber) = mpsc::channel();
            let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
            let event_bus = start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None, None)
        };

        let state: SharedState = Arc::new(Mutex::new(ViewServiceState::with_event_publisher(
            config.dead_pings,
            event_publisher.clone(),
        )));
        let dead = Arc::new(AtomicBool::new(false));

        let (listener_shutdown, listener_shutdown_receiver) = mpsc::channel();
        let listener = start_listener(
            listener,
            state.clone(),
            ConnectionConfig {
                read_timeout: config.read_timeout,
                write_timeout: config.write_timeout,
            },
            dead.clone(),
            listener_shutdown_receiver,
        );

        let (failure_detector_shutdown, failure_detector_shutdown_receiver) = mpsc::channel();
        let failure_detector = start_failure_detector(
            state.clone(),
            config.ping_interval,
            dead.clone(),
            failure_detector_shutdown_receiver,
        );

        Event::StartServer(StartServerEvent {
            timestamp: SystemTime::now(),
            listening_addr,
        })
        .publish(&event_publisher);

        Ok(ViewServer {
            listening_addr,
            state,
            dead,
            listener: Some(listener),
            listener_shutdown,
            failure_detector: Some(failure_detector),
            failure_detector_shutdown,
            event_bus,
            event_bus_shutdown,
            event_publisher,
        })
    }
}

/// A handle to the background threads of a view service. When this value is dropped, the service is
/// [killed](ViewServer::kill).
pub struct ViewServer {
    listening_addr: SocketAddr,
    state: SharedState,
    dead: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    listener_shutdown: Sender<()>,
    failure_detector: Option<JoinHandle<()>>,
    failure_detector_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
    event_publisher: Option<Sender<Event>>,
}

impl ViewServer {
    /// The address the service actually listens on. Differs from the configured one if port 0 was given.
    pub fn listening_addr(&self) -> SocketAddr {
        self.listening_addr
    }

    /// The active view, read in-process under the same lock as the `Get` RPC.
    pub fn view(&self) -> View {
        lock(&self.state).get()
    }

    /// Whether the service has been killed, or has stopped accepting connections after an accept error.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Mark the service dead, stop accepting connections, stop the failure detector, and release the
    /// listening socket. Handler threads serving already-accepted connections are not cancelled.
    ///
    /// Calling `kill` on a service that is already killed does nothing.
    pub fn kill(&mut self) {
        {
            let _state = lock(&self.state);
            self.dead.store(true, Ordering::SeqCst);
        }

        // The listener and failure detector may already have exited, so send errors are ignored.
        if let Some(listener) = self.listener.take() {
            let _ = self.listener_shutdown.send(());
            let _ = listener.join();
        }

        if let Some(failure_detector) = self.failure_detector.take() {
            let _ = self.failure_detector_shutdown.send(());
            let _ = failure_detector.join();
        }

        if let Some(event_bus) = self.event_bus.take() {
            Event::StopServer(StopServerEvent {
                timestamp: SystemTime::now(),
            })
            .publish(&self.event_publisher);

            if let Some(event_bus_shutdown) = &self.event_bus_shutdown {
                let _ = event_bus_shutdown.send(());
            }
            let _ = event_bus.join();
        }
    }
}

impl Drop for ViewServer {
    fn drop(&mut self) {
        self.kill()
    }
}

/// Enumerates the ways [`ViewServerSpec::start`] can fail.
#[derive(Debug)]
pub enum StartError {
    /// The listening address could not be bound.
    Bind(io::Error),

    /// The bound socket could not be configured.
    Configure(io::Error),
}

impl Display for StartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StartError::Bind(err) => write!(f, "failed to bind the listening address: {}", err),
            StartError::Configure(err) => write!(f, "failed to configure the listening socket: {}", err),
        }
    }
}

impl std::error::Error for StartError {}
