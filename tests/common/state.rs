//! Helpers for driving a [`ViewServiceState`] directly, without threads or sockets.

use viewservice::{
    state::{ViewServiceState, DEFAULT_DEAD_PINGS},
    types::{Address, View, ViewNumber},
};

pub(crate) const A: &str = "10.0.0.1:7000";
pub(crate) const B: &str = "10.0.0.2:7000";
pub(crate) const C: &str = "10.0.0.3:7000";

pub(crate) fn addr(name: &str) -> Address {
    Address::new(name)
}

pub(crate) fn vn(int: u64) -> ViewNumber {
    ViewNumber::new(int)
}

pub(crate) fn view(view_number: u64, primary: Option<&str>, backup: Option<&str>) -> View {
    View::new(vn(view_number), primary.map(addr), backup.map(addr))
}

pub(crate) fn ping(state: &mut ViewServiceState, name: &str, view_number: u64) -> View {
    state.ping(addr(name), vn(view_number))
}

pub(crate) fn tick_n(state: &mut ViewServiceState, n: u32) {
    for _ in 0..n {
        state.tick();
    }
}

/// A fresh service driven to the acknowledged view `{2, primary, backup}`.
pub(crate) fn acked_pair(primary: &str, backup: &str) -> ViewServiceState {
    let mut state = ViewServiceState::new(DEFAULT_DEAD_PINGS);
    assert_eq!(ping(&mut state, primary, 0), view(1, Some(primary), None));
    ping(&mut state, primary, 1);
    assert_eq!(ping(&mut state, backup, 0), view(2, Some(primary), Some(backup)));
    ping(&mut state, primary, 2);
    assert_eq!(state.acked_view_number(), vn(2));
    state
}
