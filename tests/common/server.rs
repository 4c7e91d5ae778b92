//! Helpers for running a real view service on a loopback port.

use std::{
    thread,
    time::{Duration, Instant},
};

use viewservice::view_server::{Configuration, ViewServer, ViewServerSpec};

/// Ping interval used by end-to-end tests, short so that failover happens quickly.
pub(crate) const TEST_PING_INTERVAL: Duration = Duration::from_millis(20);

pub(crate) fn test_configuration() -> Configuration {
    Configuration::builder()
        .listening_addr("127.0.0.1:0".parse().unwrap())
        .ping_interval(TEST_PING_INTERVAL)
        .build()
}

pub(crate) fn start_test_server() -> ViewServer {
    ViewServerSpec::builder()
        .configuration(test_configuration())
        .build()
        .start()
        .unwrap()
}

/// Poll `cond` until it holds or `timeout` passes. Returns whether it held.
pub(crate) fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
