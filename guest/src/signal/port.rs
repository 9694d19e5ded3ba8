//! Port I/O boot signal (x86_64 guests)
//!
//! Raises the I/O privilege level, then performs an `outb_p`: the magic byte
//! goes to the signal port and the same byte is written to the POST delay
//! port right after. The host listens on the signal port only but the
//! two-write sequence is part of the contract.

use nix::errno::Errno;

use super::{BootSignal, SignalOutcome};
use crate::consts::MAGIC_VALUE_SIGNAL_GUEST_BOOT_COMPLETE;
use crate::consts::ports::{DELAY_PORT, IO_PRIVILEGE_LEVEL, SIGNAL_PORT};
use crate::error::SignalError;

/// Raw access to the x86 I/O port space
#[cfg_attr(test, mockall::automock)]
pub trait PortBus {
    /// Request I/O privilege `level` for the calling process
    fn raise_privilege(&mut self, level: i32) -> Result<(), Errno>;

    /// Write a byte to `port`
    fn outb(&mut self, port: u16, value: u8);
}

/// Boot signal written through a [`PortBus`]
#[derive(Debug)]
pub struct PortSignal<B: PortBus> {
    bus: B,
}

impl<B: PortBus> PortSignal<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Output a byte, then pause with a write to the delay port
    fn outb_p(&mut self, value: u8, port: u16) {
        self.bus.outb(port, value);
        self.bus.outb(DELAY_PORT, value);
    }
}

impl<B: PortBus> BootSignal for PortSignal<B> {
    fn emit(&mut self) -> SignalOutcome {
        // Without IOPL 3 the out instruction faults and kills the process
        if let Err(e) = self.bus.raise_privilege(IO_PRIVILEGE_LEVEL) {
            return SignalOutcome::Skipped(SignalError::IoPrivilege(e));
        }
        self.outb_p(MAGIC_VALUE_SIGNAL_GUEST_BOOT_COMPLETE, SIGNAL_PORT);
        SignalOutcome::Emitted
    }
}

/// The real port space, via `iopl(2)` and the `out` instruction
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
#[derive(Debug, Default)]
pub struct HardwarePorts {
    privileged: bool,
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
impl HardwarePorts {
    pub fn new() -> Self {
        Self { privileged: false }
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
impl PortBus for HardwarePorts {
    fn raise_privilege(&mut self, level: i32) -> Result<(), Errno> {
        // SAFETY: iopl only changes the I/O permission bits of this process
        let res = unsafe { nix::libc::iopl(level) };
        Errno::result(res)?;
        self.privileged = true;
        Ok(())
    }

    fn outb(&mut self, port: u16, value: u8) {
        if !self.privileged {
            return;
        }
        // SAFETY: IOPL 3 was granted above, so the instruction cannot fault
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}
