pub(crate) mod logging;

pub(crate) mod server;

pub(crate) mod state;
