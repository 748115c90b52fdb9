//! Unified NAND device trait
//!
//! [`NandDevice`] is the seam hosts program against. It is object safe, so
//! a host can pick a backend at runtime and hold a `Box<dyn NandDevice>`.

use bitflags::bitflags;

use crate::bank::NandBank;
use crate::error::Result;
use crate::geometry::FlashGeometry;
use crate::window::RegisterWindow;

bitflags! {
    /// Capabilities advertised by a NAND device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NandFeatures: u32 {
        /// No program or erase path exists
        const READ_ONLY = 1 << 0;
        /// Pages can only be programmed as a whole
        const NO_SUBPAGE_WRITE = 1 << 1;
        /// Data moves over a single SPI data line
        const SINGLE_WIRE = 1 << 2;
        /// The spare area of each page is readable
        const OOB = 1 << 3;
    }
}

/// Error correction applied by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EccMode {
    /// Bytes are returned exactly as clocked out of the chip
    None,
}

/// What a device publishes to its host at probe time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Total capacity in bytes
    pub size: u64,
    /// Erase block size in bytes
    pub erase_size: u32,
    /// Page (write unit) size in bytes
    pub write_size: u32,
    /// Spare bytes per page
    pub oob_size: u32,
    /// Number of chips behind the device
    pub chip_count: u8,
    /// Capability flags
    pub features: NandFeatures,
    /// Error correction mode
    pub ecc: EccMode,
}

impl DeviceInfo {
    /// Device info of a read-only single-wire bank with the given geometry
    pub const fn from_geometry(geometry: &FlashGeometry) -> Self {
        Self {
            size: geometry.total_size(),
            erase_size: geometry.block_size,
            write_size: geometry.page_size,
            oob_size: geometry.oob_size,
            chip_count: geometry.chip_count,
            features: NandFeatures::READ_ONLY
                .union(NandFeatures::NO_SUBPAGE_WRITE)
                .union(NandFeatures::SINGLE_WIRE)
                .union(NandFeatures::OOB),
            ecc: EccMode::None,
        }
    }

    /// Number of pages on the device
    pub fn page_count(&self) -> u64 {
        self.size / self.write_size as u64
    }

    /// Number of erase blocks on the device
    pub fn block_count(&self) -> u64 {
        self.size / self.erase_size as u64
    }

    /// Whether the device rejects every modification
    pub fn is_read_only(&self) -> bool {
        self.features.contains(NandFeatures::READ_ONLY)
    }
}

/// A paged NAND device
///
/// # Example
///
/// ```ignore
/// use scai_nand_core::NandDevice;
///
/// fn first_page(device: &mut dyn NandDevice) -> Result<Vec<u8>> {
///     let mut page = vec![0u8; device.info().write_size as usize];
///     device.read_page(0, &mut page, None)?;
///     Ok(page)
/// }
/// ```
pub trait NandDevice {
    /// Geometry and capabilities
    fn info(&self) -> DeviceInfo;

    /// Bus address of a chip's register window, if the chip exists
    fn chip_base_address(&self, chip: usize) -> Option<u64>;

    /// Read one page and, if `oob` is given, its spare area
    ///
    /// # Errors
    /// * `AddressOutOfBounds` - If `page` is beyond the device
    /// * `BufferTooSmall` - If a buffer is shorter than its area
    /// * `HardwareTimeout` - If the hardware stops answering
    fn read_page(&mut self, page: u32, main: &mut [u8], oob: Option<&mut [u8]>) -> Result<()>;

    /// Read only the spare area of a page
    fn read_oob(&mut self, page: u32, oob: &mut [u8]) -> Result<()>;

    /// Read a byte range of the linear device
    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<()>;

    /// Check if a range is valid for this device
    fn is_valid_range(&self, addr: u64, len: u64) -> bool {
        addr.checked_add(len)
            .is_some_and(|end| end <= self.info().size)
    }
}

impl<W: RegisterWindow, const N: usize> NandDevice for NandBank<W, N> {
    fn info(&self) -> DeviceInfo {
        DeviceInfo::from_geometry(self.geometry())
    }

    fn chip_base_address(&self, chip: usize) -> Option<u64> {
        self.chip(chip).ok().map(|c| c.base_address())
    }

    fn read_page(&mut self, page: u32, main: &mut [u8], oob: Option<&mut [u8]>) -> Result<()> {
        NandBank::read_page(self, page, main, oob)
    }

    fn read_oob(&mut self, page: u32, oob: &mut [u8]) -> Result<()> {
        NandBank::read_oob(self, page, oob)
    }

    fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<()> {
        NandBank::read(self, addr, buf)
    }
}
