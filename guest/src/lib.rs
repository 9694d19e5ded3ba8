//! Guest boot shim
//!
//! Tells the hypervisor that the guest finished early boot, then replaces
//! itself with the real init. The signal is best effort. Only a failed
//! hand-off is reported, as the exit status.
//!
//! # Usage
//!
//! ```no_run
//! use guest_boot::{consts, run, signal};
//!
//! let code = run(signal::platform_signal(), consts::INIT_PATH, std::env::args_os());
//! std::process::exit(code);
//! ```

use std::ffi::OsStr;

use log::error;

pub mod consts;
pub mod error;
pub mod handoff;
pub mod logging;
pub mod sequence;
pub mod signal;

pub use error::{HandoffError, SignalError};
pub use handoff::{Handoff, PreparedExec};
pub use sequence::{BootSequence, BootStage};
pub use signal::{Architecture, BootSignal, SignalOutcome};

/// Signal boot completion, then exec `init_path` with `args`
///
/// Returns only if the hand-off failed, with the exit status to use.
pub fn run<S, I, A>(signal: S, init_path: &str, args: I) -> i32
where
    S: BootSignal,
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let mut sequence = BootSequence::new(signal);
    sequence.signal();

    let err = match Handoff::new(init_path) {
        Ok(handoff) => sequence.hand_off(&handoff, args),
        Err(e) => e,
    };
    error!("boot_done: {}", err);
    err.exit_code()
}
