//! Physical memory mapping of register windows
//!
//! Each chip's register block is mapped from `/dev/mem` on its own. The
//! block is far smaller than a page, so the mapping is page aligned and the
//! window pointer is offset into it.
//!
//! # Safety
//!
//! Accessing physical memory requires root privileges and the caller must
//! know the address really is the SCAI controller. Every access is volatile.

use crate::error::MmioError;

#[cfg(target_os = "linux")]
use std::path::Path;

/// A mapped register window
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Pointer to the first register of the window
    ptr: *mut u8,
    /// Size of the page-aligned mapping
    map_size: usize,
    /// Usable length of the window
    len: usize,
    /// Physical address of the window
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map `len` bytes of physical memory at `phys_addr` through `dev`
    pub fn new(dev: &Path, phys_addr: u64, len: usize) -> Result<Self, MmioError> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        // O_SYNC for uncached access
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(dev)
            .map_err(|source| MmioError::Open {
                path: dev.to_path_buf(),
                source,
            })?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (len + offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(MmioError::Map {
                address: phys_addr,
                size: len,
                source: std::io::Error::last_os_error(),
            });
        }

        log::trace!(
            "mapped {:#010x} (+{:#x}) as {:#x} bytes at {:p}",
            aligned_addr,
            offset,
            map_size,
            ptr
        );

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(offset) },
            map_size,
            len,
            phys_addr,
        })
    }

    /// Read an 8-bit register
    #[inline]
    pub fn read8(&self, offset: usize) -> u8 {
        debug_assert!(offset < self.len);
        unsafe { core::ptr::read_volatile(self.ptr.add(offset)) }
    }

    /// Read a 32-bit register
    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.len);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u32) }
    }

    /// Write a 32-bit register
    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.len);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u32, value) }
    }

    /// Physical address of the window
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Usable length of the window
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the window has no registers
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let offset = (self.phys_addr as usize) & (page_size - 1);
        let original_ptr = unsafe { self.ptr.sub(offset) };

        unsafe {
            libc::munmap(original_ptr as *mut libc::c_void, self.map_size);
        }
        log::trace!("unmapped {:#010x}", self.phys_addr);
    }
}

// The mapping is exclusively owned; registers have no aliasing concerns
#[cfg(target_os = "linux")]
unsafe impl Send for PhysMap {}

// Stub for non-Linux platforms
#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    pub fn new(
        _dev: &std::path::Path,
        _phys_addr: u64,
        _len: usize,
    ) -> Result<Self, MmioError> {
        Err(MmioError::NotSupported(
            "Physical memory mapping only supported on Linux",
        ))
    }

    pub fn read8(&self, _offset: usize) -> u8 { 0 }
    pub fn read32(&self, _offset: usize) -> u32 { 0 }
    pub fn write32(&self, _offset: usize, _value: u32) {}
    pub fn phys_addr(&self) -> u64 { 0 }
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

impl scai_nand_core::RegisterWindow for PhysMap {
    fn read32(&self, offset: usize) -> u32 {
        PhysMap::read32(self, offset)
    }

    fn write32(&self, offset: usize, value: u32) {
        PhysMap::write32(self, offset, value)
    }

    fn read8(&self, offset: usize) -> u8 {
        PhysMap::read8(self, offset)
    }

    fn delay_us(&self, us: u32) {
        if us == 0 {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(std::time::Duration::from_micros(us as u64));
        }
    }

    fn base_address(&self) -> u64 {
        self.phys_addr()
    }
}
