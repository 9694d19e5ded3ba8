//! Memory-mapped boot signal (AArch64 guests)
//!
//! The host exposes a control register at a fixed physical address. One page
//! of `/dev/mem` is mapped shared at that offset and the magic byte is stored
//! to its first byte. The device descriptor is closed as soon as the mapping
//! exists and the page is unmapped before returning. Once the byte is stored
//! the signal counts as emitted; a failing unmap is ignored.

use core::ffi::c_void;
use core::num::NonZeroUsize;
use core::ptr::write_volatile;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::libc::off_t;
use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use nix::sys::stat::Mode;
use nix::unistd::{SysconfVar, close, sysconf};

use super::{BootSignal, SignalOutcome};
use crate::consts::MAGIC_VALUE_SIGNAL_GUEST_BOOT_COMPLETE;
use crate::consts::mmio::{DEVICE_PATH, SIGNAL_PHYS_ADDR};
use crate::error::SignalError;

/// Boot signal written through a shared mapping of a memory device
#[derive(Debug, Clone)]
pub struct MmioSignal {
    device: PathBuf,
    offset: u64,
}

impl MmioSignal {
    /// Signal register at `offset` within `device`; `offset` must be page aligned
    pub fn new(device: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            device: device.into(),
            offset,
        }
    }

    /// The host control register behind `/dev/mem`
    pub fn host_register() -> Self {
        Self::new(DEVICE_PATH, SIGNAL_PHYS_ADDR)
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn write_signal(&self) -> Result<(), SignalError> {
        let device = DeviceFd::open(&self.device)?;
        let len = page_size()?;
        let page = MappedPage::map(device.0, len, self.offset);
        drop(device);
        let page = page?;

        // SAFETY: the page is mapped read-write and at least one byte long
        let mut reg = unsafe { Mmio8::new(page.addr()) };
        reg.write(MAGIC_VALUE_SIGNAL_GUEST_BOOT_COMPLETE);
        Ok(())
    }
}

impl BootSignal for MmioSignal {
    fn emit(&mut self) -> SignalOutcome {
        SignalOutcome::from_result(self.write_signal())
    }
}

/// System page size
pub fn page_size() -> Result<NonZeroUsize, SignalError> {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) => usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(SignalError::PageSize),
        _ => Err(SignalError::PageSize),
    }
}

/// Open descriptor on the memory device, closed on drop
struct DeviceFd(RawFd);

impl DeviceFd {
    fn open(path: &Path) -> Result<Self, SignalError> {
        open(path, OFlag::O_RDWR | OFlag::O_CLOEXEC, Mode::empty())
            .map(DeviceFd)
            .map_err(SignalError::DeviceOpen)
    }
}

impl Drop for DeviceFd {
    fn drop(&mut self) {
        let _ = close(self.0);
    }
}

/// Shared read-write mapping of one page, unmapped on drop
struct MappedPage {
    addr: *mut c_void,
    len: NonZeroUsize,
}

impl MappedPage {
    fn map(fd: RawFd, len: NonZeroUsize, offset: u64) -> Result<Self, SignalError> {
        let offset = off_t::try_from(offset).map_err(|_| SignalError::Map(Errno::EOVERFLOW))?;
        // SAFETY: a fresh mapping chosen by the kernel aliases no Rust memory
        let addr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                fd,
                offset,
            )
        }
        .map_err(SignalError::Map)?;
        Ok(Self { addr, len })
    }

    fn addr(&self) -> usize {
        self.addr as usize
    }
}

impl Drop for MappedPage {
    fn drop(&mut self) {
        // SAFETY: the mapping is owned by `self` and not used afterwards
        let _ = unsafe { munmap(self.addr, self.len.get()) };
    }
}

/// 8-bit memory-mapped register
struct Mmio8 {
    addr: *mut u8,
}

impl Mmio8 {
    /// # Safety
    /// - `addr` must point to mapped, writable memory for the lifetime of the
    ///   register
    unsafe fn new(addr: usize) -> Self {
        Self { addr: addr as *mut u8 }
    }

    fn write(&mut self, val: u8) {
        unsafe { write_volatile(self.addr, val) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn backing_file(pages: usize) -> (tempfile::NamedTempFile, usize) {
        let page = page_size().unwrap().get();
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len((page * pages) as u64).unwrap();
        (file, page)
    }

    #[test]
    fn test_mmio_signal_writes_magic_byte_once() {
        let (file, page) = backing_file(2);
        let mut signal = MmioSignal::new(file.path(), page as u64);

        assert_eq!(signal.emit(), SignalOutcome::Emitted);

        let contents = fs::read(file.path()).unwrap();
        assert_eq!(contents[page], 123);
        assert_eq!(contents.iter().filter(|&&b| b != 0).count(), 1);
    }

    #[test]
    fn test_mmio_signal_is_idempotent() {
        let (file, _) = backing_file(1);
        let mut signal = MmioSignal::new(file.path(), 0);

        assert_eq!(signal.emit(), SignalOutcome::Emitted);
        let first = fs::read(file.path()).unwrap();
        assert_eq!(signal.emit(), SignalOutcome::Emitted);
        let second = fs::read(file.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second[0], 123);
    }

    #[test]
    fn test_mmio_signal_releases_mapping() {
        let (file, _) = backing_file(1);
        let mut signal = MmioSignal::new(file.path(), 0);
        assert!(signal.emit().is_emitted());

        let maps = fs::read_to_string("/proc/self/maps").unwrap();
        let name = file.path().to_string_lossy();
        assert!(!maps.contains(name.as_ref()));
    }

    #[test]
    fn test_mapped_page_unmaps_on_drop() {
        let (file, page) = backing_file(1);
        let name = file.path().to_string_lossy().into_owned();
        let device = DeviceFd::open(file.path()).unwrap();
        let len = NonZeroUsize::new(page).unwrap();
        let mapped = MappedPage::map(device.0, len, 0).unwrap();
        drop(device);

        let maps = fs::read_to_string("/proc/self/maps").unwrap();
        assert!(maps.contains(&name));

        drop(mapped);
        let maps = fs::read_to_string("/proc/self/maps").unwrap();
        assert!(!maps.contains(&name));
    }

    #[test]
    fn test_mmio_signal_emitted_means_byte_written() {
        let (file, _) = backing_file(1);
        let mut signal = MmioSignal::new(file.path(), 0);
        match signal.emit() {
            SignalOutcome::Emitted => assert_eq!(fs::read(file.path()).unwrap()[0], 123),
            SignalOutcome::Skipped(e) => panic!("skipped after a successful map: {e}"),
        }
    }

    #[test]
    fn test_mmio_signal_missing_device_is_skipped() {
        let mut signal = MmioSignal::new("/nonexistent/mem", 0);
        assert_eq!(
            signal.emit(),
            SignalOutcome::Skipped(SignalError::DeviceOpen(Errno::ENOENT))
        );
    }

    #[test]
    fn test_mmio_signal_unaligned_offset_is_skipped() {
        let (file, _) = backing_file(1);
        let mut signal = MmioSignal::new(file.path(), 1);
        assert_eq!(
            signal.emit(),
            SignalOutcome::Skipped(SignalError::Map(Errno::EINVAL))
        );
        assert!(fs::read(file.path()).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_host_register_contract() {
        let signal = MmioSignal::host_register();
        assert_eq!(signal.device(), Path::new("/dev/mem"));
        assert_eq!(signal.offset(), 0x4000_0000);
    }
}
