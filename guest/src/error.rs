//! Guest boot error handling
//!
//! Two independent failure domains: signal emission errors are best effort
//! and never stop the boot, hand-off errors are fatal and become the exit
//! status of the process.

use core::fmt;

use nix::errno::Errno;

/// Boot signal error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalError {
    /// The physical memory device could not be opened
    DeviceOpen(Errno),
    /// The system page size could not be determined
    PageSize,
    /// Mapping the signal page failed
    Map(Errno),
    /// Raising the I/O privilege level failed
    IoPrivilege(Errno),
    /// No signal mechanism exists for this build
    UnsupportedArchitecture,
}

impl SignalError {
    /// Convert to a stable numeric code for diagnostics
    pub fn as_error_code(&self) -> u32 {
        match self {
            SignalError::DeviceOpen(_) => 0x1000,
            SignalError::PageSize => 0x1001,
            SignalError::Map(_) => 0x1002,
            SignalError::IoPrivilege(_) => 0x2000,
            SignalError::UnsupportedArchitecture => 0x3000,
        }
    }

    /// Underlying errno, if the failure came from a system call
    pub fn errno(&self) -> Option<Errno> {
        match self {
            SignalError::DeviceOpen(e) | SignalError::Map(e) | SignalError::IoPrivilege(e) => {
                Some(*e)
            }
            SignalError::PageSize | SignalError::UnsupportedArchitecture => None,
        }
    }
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::DeviceOpen(e) => write!(f, "cannot open physical memory device: {}", e),
            SignalError::PageSize => write!(f, "cannot determine page size"),
            SignalError::Map(e) => write!(f, "cannot map signal page: {}", e),
            SignalError::IoPrivilege(e) => write!(f, "cannot raise I/O privilege level: {}", e),
            SignalError::UnsupportedArchitecture => {
                write!(f, "no boot signal mechanism for this architecture")
            }
        }
    }
}

impl std::error::Error for SignalError {}

/// Exit status reported when init could not be launched
pub const HANDOFF_FAILURE_EXIT_CODE: i32 = -1;

/// Process hand-off error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// Init path is empty or contains a NUL byte
    InvalidPath,
    /// Argument at `index` contains a NUL byte and cannot be passed to exec
    InvalidArgument { index: usize },
    /// The exec call itself failed
    Exec { path: String, errno: Errno },
}

impl HandoffError {
    /// Exit status the process terminates with after a failed hand-off
    pub fn exit_code(&self) -> i32 {
        HANDOFF_FAILURE_EXIT_CODE
    }
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandoffError::InvalidPath => write!(f, "invalid init path"),
            HandoffError::InvalidArgument { index } => {
                write!(f, "argument {} contains a NUL byte", index)
            }
            HandoffError::Exec { path, errno } => write!(f, "cannot exec {}: {}", path, errno),
        }
    }
}

impl std::error::Error for HandoffError {}
