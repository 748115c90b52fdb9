//! Flash geometry of the bank
//!
//! The geometry is fixed for the device family and never changes at runtime.
//! The total capacity is always derived from the per-chip capacity and the
//! chip count rather than stored separately.

use crate::error::{Error, Result};
use crate::regs::ADDRESS_UNIT;

/// Largest chip a 24-bit address word in 256-byte units can cover
const MAX_CHIP_SIZE: u64 = ADDRESS_UNIT << 24;

/// Geometry of the whole bank and of each chip in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct FlashGeometry {
    /// Main-area bytes per page
    pub page_size: u32,
    /// Spare (OOB) bytes per page
    pub oob_size: u32,
    /// Erase block size in bytes
    pub block_size: u32,
    /// Capacity of a single chip in bytes
    pub chip_size: u64,
    /// Number of chips in the bank
    pub chip_count: u8,
}

impl FlashGeometry {
    /// Eight Micron MT29F8G01ADBFD12 chips, 1 GiB each
    pub const MT29F8G01: Self = Self {
        page_size: 4096,
        oob_size: 256,
        block_size: 256 * 1024,
        chip_size: 1 << 30,
        chip_count: 8,
    };

    /// Total capacity of the bank in bytes
    pub const fn total_size(&self) -> u64 {
        self.chip_size * self.chip_count as u64
    }

    /// Number of pages held by one chip
    pub const fn pages_per_chip(&self) -> u32 {
        (self.chip_size / self.page_size as u64) as u32
    }

    /// Number of pages in the whole bank
    pub const fn page_count(&self) -> u32 {
        self.pages_per_chip() * self.chip_count as u32
    }

    /// Number of pages in one erase block
    pub const fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }

    /// Logical byte address of the first byte of `page`
    pub const fn page_address(&self, page: u32) -> u64 {
        page as u64 * self.page_size as u64
    }

    /// Erase block containing `page`
    pub const fn block_of_page(&self, page: u32) -> u32 {
        page / self.pages_per_block()
    }

    /// Check that the geometry describes a usable bank
    ///
    /// Besides internal consistency this checks that every page start can be
    /// expressed in the 24-bit, 256-byte-unit address word sent to a chip.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.oob_size == 0 || self.chip_count == 0 {
            return Err(Error::InvalidGeometry);
        }
        if self.chip_size == 0 || self.chip_size % self.page_size as u64 != 0 {
            return Err(Error::InvalidGeometry);
        }
        if self.block_size < self.page_size || self.block_size % self.page_size != 0 {
            return Err(Error::InvalidGeometry);
        }
        if self.page_size as u64 % ADDRESS_UNIT != 0 || self.chip_size > MAX_CHIP_SIZE {
            return Err(Error::InvalidGeometry);
        }
        let total = self
            .chip_size
            .checked_mul(self.chip_count as u64)
            .ok_or(Error::InvalidGeometry)?;
        // Page numbers are carried as u32
        if total / self.page_size as u64 > u32::MAX as u64 {
            return Err(Error::InvalidGeometry);
        }
        Ok(())
    }
}

impl Default for FlashGeometry {
    fn default() -> Self {
        Self::MT29F8G01
    }
}
