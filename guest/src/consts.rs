//! Host/guest contract constants
//!
//! These values are observed by the hypervisor and must stay bit-exact.

use static_assertions::const_assert;

/// Byte written to signal that guest boot has completed
pub const MAGIC_VALUE_SIGNAL_GUEST_BOOT_COMPLETE: u8 = 123;

/// Init binary selected at build time (`GUEST_INIT_PATH`)
pub const INIT_PATH: &str = env!("GUEST_BOOT_INIT_PATH");

/// Memory-mapped signal register (aarch64 guests)
pub mod mmio {
    /// Privileged physical memory device
    pub const DEVICE_PATH: &str = "/dev/mem";
    /// Physical offset of the host-visible control register
    pub const SIGNAL_PHYS_ADDR: u64 = 0x4000_0000;
}

/// Port I/O signal (x86_64 guests)
pub mod ports {
    /// Boot-complete signal port
    pub const SIGNAL_PORT: u16 = 0x03F0;
    /// POST diagnostic port, written after raw port output as a short delay
    pub const DELAY_PORT: u16 = 0x80;
    /// `iopl` level granting unrestricted port access
    pub const IO_PRIVILEGE_LEVEL: i32 = 3;
}

// Must be page aligned for mmap on any page size up to 64K
const_assert!(mmio::SIGNAL_PHYS_ADDR % 0x10000 == 0);
const_assert!(ports::SIGNAL_PORT != ports::DELAY_PORT);
const_assert!(ports::IO_PRIVILEGE_LEVEL == 3);
