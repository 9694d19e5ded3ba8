//! Boot-complete signalling
//!
//! Exactly one [`BootSignal`] implementation is selected per build target:
//! port I/O on x86_64, a memory-mapped register on AArch64, and a no-op
//! everywhere else. Emission is best effort. Its result is a
//! [`SignalOutcome`] that callers may log and otherwise ignore.

use crate::error::SignalError;

pub mod mmio;
pub mod port;

pub use mmio::MmioSignal;
pub use port::{PortBus, PortSignal};

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub use port::HardwarePorts;

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    AArch64,
    Other,
}

impl Architecture {
    /// Get the current architecture at compile time
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Architecture::AArch64
        } else {
            Architecture::Other
        }
    }

    /// Whether a signal mechanism exists for this architecture
    pub fn has_signal(self) -> bool {
        !matches!(self, Architecture::Other)
    }
}

/// Result of a signal emission
///
/// Not `#[must_use]`: a skipped signal is never a reason to stop booting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The magic byte reached the host-visible register or port
    Emitted,
    /// Nothing was written to the register or port
    Skipped(SignalError),
}

impl SignalOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, SignalOutcome::Emitted)
    }

    pub(crate) fn from_result(result: Result<(), SignalError>) -> Self {
        match result {
            Ok(()) => SignalOutcome::Emitted,
            Err(e) => SignalOutcome::Skipped(e),
        }
    }
}

/// Notifies the host that early boot has completed
#[cfg_attr(test, mockall::automock)]
pub trait BootSignal {
    /// Write the boot-complete value once. Never fails the caller.
    fn emit(&mut self) -> SignalOutcome;
}

/// Signal for targets without a host listener
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSignal;

impl BootSignal for NoSignal {
    fn emit(&mut self) -> SignalOutcome {
        SignalOutcome::Skipped(SignalError::UnsupportedArchitecture)
    }
}

#[cfg(all(feature = "signal", target_os = "linux", target_arch = "x86_64"))]
pub type PlatformSignal = PortSignal<HardwarePorts>;

#[cfg(all(feature = "signal", target_os = "linux", target_arch = "aarch64"))]
pub type PlatformSignal = MmioSignal;

#[cfg(not(all(
    feature = "signal",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
pub type PlatformSignal = NoSignal;

/// Signal implementation selected for this build
#[cfg(all(feature = "signal", target_os = "linux", target_arch = "x86_64"))]
pub fn platform_signal() -> PlatformSignal {
    PortSignal::new(HardwarePorts::new())
}

/// Signal implementation selected for this build
#[cfg(all(feature = "signal", target_os = "linux", target_arch = "aarch64"))]
pub fn platform_signal() -> PlatformSignal {
    MmioSignal::host_register()
}

/// Signal implementation selected for this build
#[cfg(not(all(
    feature = "signal",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
pub fn platform_signal() -> PlatformSignal {
    NoSignal
}
