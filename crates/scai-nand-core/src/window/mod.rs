//! Register window traits
//!
//! A register window is the mapped view of one chip's control block. The
//! driver only ever talks to the hardware through these two traits:
//!
//! - [`RegisterWindow`] performs single register accesses on a mapped window
//! - [`WindowMapper`] maps windows at bank initialization
//!
//! Unmapping is tied to ownership: dropping a window releases its mapping.
//! This is what gives bank initialization its all-or-nothing behavior.

use crate::address::ChipIndex;
use crate::error::Result;

#[cfg(test)]
pub(crate) mod fake;

/// Access to one mapped register window
///
/// Accesses take `&self` because they are volatile MMIO operations; the
/// driver serializes them through `&mut` borrows of the bank.
pub trait RegisterWindow {
    /// Read a 32-bit register at `offset`
    fn read32(&self, offset: usize) -> u32;

    /// Write a 32-bit register at `offset`
    fn write32(&self, offset: usize, value: u32);

    /// Read an 8-bit register at `offset`
    fn read8(&self, offset: usize) -> u8;

    /// Wait between two status polls
    fn delay_us(&self, us: u32);

    /// Bus address this window was mapped from
    fn base_address(&self) -> u64;
}

/// Maps register windows for bank initialization
pub trait WindowMapper {
    /// Window type produced by this mapper
    type Window: RegisterWindow;

    /// Map the `len`-byte register block of `chip` found at bus address `base`
    ///
    /// # Errors
    /// * `MapFailed` - If the region could not be mapped
    fn map(&mut self, chip: ChipIndex, base: u64, len: usize) -> Result<Self::Window>;
}
