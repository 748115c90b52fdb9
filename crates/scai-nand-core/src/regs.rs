//! SCAI QSPI NAND register definitions
//!
//! Every chip has the same four-register block at the start of its window.
//! The control register doubles as the chip-enable register, so it is always
//! updated read-modify-write when only the CE bit should change.

use bitflags::bitflags;

// ============================================================================
// Register offsets (bytes from the window base)
// ============================================================================

/// Control register, including chip enable (32 bits, RW)
pub const REG_CTRL1: usize = 0x00;
/// Outgoing data register (32 bits, W)
pub const REG_WR_DATA: usize = 0x04;
/// Incoming data register (8 bits used, R)
pub const REG_RD_DATA: usize = 0x08;
/// Operation status register (32 bits, R)
pub const REG_STATUS: usize = 0x0C;

/// Length of each register window as mapped from the bus
pub const WINDOW_SIZE: usize = 0x100;

/// APB base of the register windows
pub const APB_BASE: u64 = 0x7000_0000;

/// Bus addresses of the register windows of chips M0 to M7
pub const SCAI_BASE_ADDRESSES: [u64; 8] = [
    APB_BASE + 0x0400,
    APB_BASE + 0x0410,
    APB_BASE + 0x0420,
    APB_BASE + 0x0430,
    APB_BASE + 0x0500,
    APB_BASE + 0x0510,
    APB_BASE + 0x0520,
    APB_BASE + 0x0530,
];

// ============================================================================
// Register bits
// ============================================================================

bitflags! {
    /// Bits of the control register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Ctrl1: u32 {
        /// Controller enable
        const ENABLE     = 1 << 0;
        /// Chip enable (CE) of the attached NAND
        const ACTIVATE_CE = 1 << 1;
        /// Transfer width: 1 = four-wire (QSPI), 0 = single-wire (SPI)
        const SET_X4NX1  = 1 << 5;
        /// Start one transfer
        const START_OP   = 1 << 11;
    }
}

bitflags! {
    /// Bits of the status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        /// The register interface finished its last transfer
        const IDLE = 1 << 0;
    }
}

// ============================================================================
// SPI NAND opcodes (Micron MT29F)
// ============================================================================

/// Page read: move a page from the array into the chip's cache register
pub const NAND_READ_PAGE: u8 = 0x13;
/// Read from cache: stream bytes out of the cache register
pub const NAND_READ_CACHE: u8 = 0x03;

/// Build the word that starts one transfer on a selected chip
///
/// The word always forces single-wire mode and keeps CE asserted so that
/// writing it never deselects the chip mid-transaction.
pub const fn transfer_word() -> Ctrl1 {
    Ctrl1::ENABLE
        .union(Ctrl1::ACTIVATE_CE)
        .union(Ctrl1::START_OP)
        .difference(Ctrl1::SET_X4NX1)
}

/// Granularity of the intra-chip offset sent in the address phase
pub const ADDRESS_UNIT: u64 = 1 << 8;

/// Encode an intra-chip byte offset for the address phase
///
/// The chip family takes the offset in units of 256 bytes, so the low byte is
/// dropped and the remaining 24 bits are sent.
pub const fn encode_address(offset: u64) -> u32 {
    ((offset >> 8) as u32) & 0x00FF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_bit_positions() {
        assert_eq!(Ctrl1::ENABLE.bits(), 0x0000_0001);
        assert_eq!(Ctrl1::ACTIVATE_CE.bits(), 0x0000_0002);
        assert_eq!(Ctrl1::SET_X4NX1.bits(), 0x0000_0020);
        assert_eq!(Ctrl1::START_OP.bits(), 0x0000_0800);
        assert_eq!(Status::IDLE.bits(), 0x0000_0001);
    }

    #[test]
    fn test_transfer_word_is_single_wire() {
        let word = transfer_word();
        assert!(word.contains(Ctrl1::ENABLE | Ctrl1::START_OP | Ctrl1::ACTIVATE_CE));
        assert!(!word.contains(Ctrl1::SET_X4NX1));
        assert_eq!(word.bits(), 0x0000_0803);
    }

    #[test]
    fn test_encode_address() {
        assert_eq!(encode_address(0), 0);
        assert_eq!(encode_address(0x1000), 0x10);
        assert_eq!(encode_address(0x1FF), 0x01);
        assert_eq!(encode_address((1 << 30) - 4096), 0x3F_FFF0);
        assert_eq!(encode_address(u64::MAX), 0x00FF_FFFF);
    }
}
