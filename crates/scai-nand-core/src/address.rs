//! Logical address translation
//!
//! The bank is one linear address space. Chip `k` owns the byte range
//! `[k * chip_size, (k + 1) * chip_size)`; the position inside that range is
//! the intra-chip offset that gets sent to the chip.

use core::fmt;

use crate::error::{Error, Result};
use crate::geometry::FlashGeometry;

/// Index of a chip inside the bank
///
/// A `ChipIndex` can only be built for an index below the chip count, so
/// indexing the per-chip array with it never goes out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChipIndex(u8);

impl ChipIndex {
    /// Create a chip index, checking it against the number of chips
    pub fn new(index: usize, chip_count: usize) -> Option<Self> {
        if index < chip_count && index <= u8::MAX as usize {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// The index as a `usize`, for array access
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// The index as stored in error values
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ChipIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A logical address resolved to a chip and a byte offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipOffset {
    /// Chip holding the address
    pub chip: ChipIndex,
    /// Byte offset inside that chip
    pub offset: u64,
}

/// Translate a logical byte address into a chip and intra-chip offset
///
/// # Errors
/// * `AddressOutOfBounds` - If `addr` is at or beyond the end of the bank
pub fn translate(geometry: &FlashGeometry, addr: u64) -> Result<ChipOffset> {
    if addr >= geometry.total_size() {
        return Err(Error::AddressOutOfBounds);
    }

    let index = (addr / geometry.chip_size) as usize;
    let chip =
        ChipIndex::new(index, geometry.chip_count as usize).ok_or(Error::AddressOutOfBounds)?;

    Ok(ChipOffset {
        chip,
        offset: addr % geometry.chip_size,
    })
}

/// Translate a page number into the chip and offset of its first byte
pub fn translate_page(geometry: &FlashGeometry, page: u32) -> Result<ChipOffset> {
    translate(geometry, geometry.page_address(page))
}
