//! Test of what happens when the listener hits a fatal accept error: the service must be marked dead and the
//! failure detector must stop changing the view.
//!
//! The accept error is caused by exhausting the process's file descriptors, so this test lives in its own
//! binary, where no other test can be affected.

#![cfg(target_os = "linux")]

use std::{
    fs::File,
    net::TcpStream,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use viewservice::{
    networking::{
        messages::{Ping, ViewServiceRequest, ViewServiceResponse},
        stream::{read_frame, write_frame},
    },
    view_server::ViewServerSpec,
};

mod common;

use common::{
    server::{test_configuration, wait_until, TEST_PING_INTERVAL},
    state::{addr, view, vn, A, B},
};

/// Upper bound on descriptors opened while looking for the limit.
const MAX_OPEN_FILES: usize = 1 << 21;

fn ping_over(stream: &mut TcpStream, name: &str, view_number: u64) -> ViewServiceResponse {
    let request = ViewServiceRequest::from(Ping {
        me: addr(name),
        view_number: vn(view_number),
    });
    write_frame(stream, &request).unwrap();
    read_frame(stream).unwrap()
}

#[test]
fn detector_stops_once_accepting_fails_test() {
    let server = ViewServerSpec::builder()
        .configuration(test_configuration())
        .build()
        .start()
        .unwrap();

    let mut stream = TcpStream::connect(server.listening_addr()).unwrap();
    ping_over(&mut stream, A, 0);
    ping_over(&mut stream, A, 1);
    ping_over(&mut stream, B, 0);
    assert_eq!(*ping_over(&mut stream, A, 2).view(), view(2, Some(A), Some(B)));

    // Keep both replicas alive over the already-open connection, which needs no new descriptors.
    let keep_pinging = Arc::new(AtomicBool::new(true));
    let pinger = {
        let keep_pinging = keep_pinging.clone();
        thread::spawn(move || {
            while keep_pinging.load(Ordering::SeqCst) {
                ping_over(&mut stream, A, 2);
                ping_over(&mut stream, B, 2);
                thread::sleep(TEST_PING_INTERVAL / 2);
            }
        })
    };

    let mut files = Vec::new();
    while files.len() < MAX_OPEN_FILES {
        match File::open("/dev/null") {
            Ok(file) => files.push(file),
            Err(_) => break,
        }
    }
    if files.len() == MAX_OPEN_FILES {
        keep_pinging.store(false, Ordering::SeqCst);
        pinger.join().unwrap();
        eprintln!("descriptor limit is too high to exhaust, skipping");
        return;
    }

    // Free exactly one descriptor for the client socket, leaving none for the accepted one.
    files.pop();
    let _doomed = TcpStream::connect(server.listening_addr()).unwrap();
    let died = wait_until(Duration::from_secs(5), || server.is_dead());
    drop(files);

    keep_pinging.store(false, Ordering::SeqCst);
    pinger.join().unwrap();
    assert!(died);

    let view_at_death = server.view();
    assert_eq!(view_at_death, view(2, Some(A), Some(B)));

    // Far longer than it takes to declare both replicas dead.
    thread::sleep(TEST_PING_INTERVAL * 20);
    assert_eq!(server.view(), view_at_death);
}
