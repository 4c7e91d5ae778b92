//! Tests for the command line of the `viewserver` binary.

use std::process::Command;

#[test]
fn unknown_log_level_is_rejected_test() {
    let output = Command::new(env!("CARGO_BIN_EXE_viewserver"))
        .args(["127.0.0.1:0", "--log-level", "verbose"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown log level `verbose`"), "stderr was: {}", stderr);
}

#[test]
fn unparseable_listening_address_is_rejected_test() {
    let output = Command::new(env!("CARGO_BIN_EXE_viewserver"))
        .args(["not-an-address"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}
