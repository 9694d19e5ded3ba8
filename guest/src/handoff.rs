//! Process hand-off to the real init
//!
//! The shim replaces its own process image with init, forwarding argv
//! untouched (including `argv[0]`) and inheriting the environment. Signal
//! dispositions changed by the Rust runtime are restored first, so init
//! starts with the state the kernel gave the shim. On success nothing after
//! the exec runs. On failure the error becomes the exit status.

use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;

use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::execv;

use crate::error::HandoffError;

/// Init program the shim hands off to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    path: CString,
}

impl Handoff {
    pub fn new(path: impl AsRef<OsStr>) -> Result<Self, HandoffError> {
        let bytes = path.as_ref().as_bytes();
        if bytes.is_empty() {
            return Err(HandoffError::InvalidPath);
        }
        let path = CString::new(bytes).map_err(|_| HandoffError::InvalidPath)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &CStr {
        &self.path
    }

    /// Convert `args` into an exec-ready argument vector
    ///
    /// Conversion and validation happen here, so [`PreparedExec::exec`] can
    /// only fail in the kernel.
    pub fn prepare<I, S>(&self, args: I) -> Result<PreparedExec, HandoffError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let argv = args
            .into_iter()
            .enumerate()
            .map(|(index, arg)| {
                CString::new(arg.as_ref().as_bytes())
                    .map_err(|_| HandoffError::InvalidArgument { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PreparedExec {
            path: self.path.clone(),
            argv,
        })
    }

    /// Replace the current process with init. Only returns on failure.
    pub fn exec<I, S>(&self, args: I) -> HandoffError
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        match self.prepare(args) {
            Ok(prepared) => prepared.exec(),
            Err(e) => e,
        }
    }
}

/// Init path and argv converted to C strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedExec {
    path: CString,
    argv: Vec<CString>,
}

impl PreparedExec {
    pub fn path(&self) -> &CStr {
        &self.path
    }

    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// `execv` into init. Only returns on failure.
    pub fn exec(&self) -> HandoffError {
        let previous = reset_sigpipe();
        match execv(&self.path, &self.argv) {
            Ok(never) => match never {},
            Err(errno) => {
                restore_sigpipe(previous);
                HandoffError::Exec {
                    path: self.path.to_string_lossy().into_owned(),
                    errno,
                }
            }
        }
    }
}

/// Undo the runtime's `SIG_IGN` for SIGPIPE, which would survive the exec
fn reset_sigpipe() -> Option<SigHandler> {
    // SAFETY: SIG_DFL installs no Rust handler
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }.ok()
}

/// Put back the disposition the shim ran with after a failed exec
fn restore_sigpipe(previous: Option<SigHandler>) {
    if let Some(handler) = previous {
        // SAFETY: `handler` was installed before and is still valid
        let _ = unsafe { signal(Signal::SIGPIPE, handler) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nix::errno::Errno;
    use proptest::prelude::*;
    use std::os::unix::ffi::OsStringExt;

    #[test]
    fn test_handoff_rejects_empty_path() {
        assert_eq!(Handoff::new(""), Err(HandoffError::InvalidPath));
    }

    #[test]
    fn test_handoff_rejects_nul_in_path() {
        assert_eq!(Handoff::new("/sbin/\0init"), Err(HandoffError::InvalidPath));
    }

    #[test]
    fn test_prepare_keeps_argv0() {
        let handoff = Handoff::new("/sbin/openrc-init").unwrap();
        let prepared = handoff.prepare(["init", "single"]).unwrap();
        assert_eq!(prepared.path().to_bytes(), b"/sbin/openrc-init");
        assert_eq!(prepared.argv()[0].as_bytes(), b"init");
        assert_eq!(prepared.argv()[1].as_bytes(), b"single");
        assert_eq!(prepared.argv().len(), 2);
    }

    #[test]
    fn test_prepare_accepts_empty_argv() {
        let handoff = Handoff::new("/sbin/openrc-init").unwrap();
        let args: [&str; 0] = [];
        assert!(handoff.prepare(args).unwrap().argv().is_empty());
    }

    #[test]
    fn test_prepare_reports_nul_argument_index() {
        let handoff = Handoff::new("/sbin/openrc-init").unwrap();
        let err = handoff.prepare(["init", "ok", "bad\0arg"]).unwrap_err();
        assert_eq!(err, HandoffError::InvalidArgument { index: 2 });
    }

    #[test]
    fn test_exec_missing_init_returns_enoent() {
        let handoff = Handoff::new("/nonexistent/sbin/init").unwrap();
        let err = handoff.exec(["init", "single"]);
        assert_eq!(
            err,
            HandoffError::Exec {
                path: "/nonexistent/sbin/init".into(),
                errno: Errno::ENOENT
            }
        );
        assert_ne!(err.exit_code(), 0);
    }

    proptest! {
        #[test]
        fn test_prepare_forwards_bytes_unchanged(
            args in proptest::collection::vec(proptest::collection::vec(1u8..=255, 0..24), 0..8)
        ) {
            let handoff = Handoff::new("/sbin/init").unwrap();
            let os_args: Vec<std::ffi::OsString> =
                args.iter().cloned().map(std::ffi::OsString::from_vec).collect();
            let prepared = handoff.prepare(&os_args).unwrap();
            prop_assert_eq!(prepared.argv().len(), args.len());
            for (c, raw) in prepared.argv().iter().zip(&args) {
                prop_assert_eq!(c.as_bytes(), raw.as_slice());
            }
        }
    }
}
