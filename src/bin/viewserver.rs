/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Runs a view service on the given address until the process is killed.

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use log::LevelFilter;
use viewservice::view_server::{Configuration, ViewServerSpec};

#[derive(Parser, Debug)]
#[command(name = "viewserver")]
#[command(version, about = "Tracks the primary and backup of a replica pair", long_about = None)]
struct Cli {
    /// Address to listen on, e.g. 127.0.0.1:7000
    listening_addr: SocketAddr,

    /// Log level filter (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", value_parser = parse_level_filter)]
    log_level: LevelFilter,
}

fn parse_level_filter(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("unknown log level `{}`, expected one of off, error, warn, info, debug, trace", s))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logger(cli.log_level) {
        eprintln!("failed to set up logging: {}", err);
        return ExitCode::FAILURE;
    }

    let configuration = Configuration::builder()
        .listening_addr(cli.listening_addr)
        .log_events(true)
        .build();

    let _server = match ViewServerSpec::builder().configuration(configuration).build().start() {
        Ok(server) => server,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    loop {
        thread::park();
    }
}

fn setup_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:?}][{}] {}",
                thread::current().id(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()
}
