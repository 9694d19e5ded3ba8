//! SIGPIPE disposition of the shim itself around a failed hand-off
//!
//! Kept in its own test binary: the check reads process-wide state that
//! any concurrent exec attempt would change.

use std::fs;

use guest_boot::{Handoff, HandoffError};
use nix::sys::signal::Signal;

fn sigpipe_ignored() -> bool {
    let status = fs::read_to_string("/proc/self/status").unwrap();
    let line = status
        .lines()
        .find(|l| l.starts_with("SigIgn:"))
        .expect("no SigIgn line");
    let mask = u64::from_str_radix(line.trim_start_matches("SigIgn:").trim(), 16).unwrap();
    mask & (1 << (Signal::SIGPIPE as u64 - 1)) != 0
}

#[test]
fn test_failed_handoff_keeps_runtime_sigpipe() {
    // The Rust runtime ignores SIGPIPE before main
    assert!(sigpipe_ignored());

    let err = Handoff::new("/nonexistent/sbin/openrc-init")
        .unwrap()
        .exec(["init"]);
    assert!(matches!(err, HandoffError::Exec { .. }));
    assert!(sigpipe_ignored());
}
