//! Error types for scai-nand-core
//!
//! This module provides a no_std compatible error type that is used
//! throughout the crate.

use core::fmt;

/// Register transaction that was in flight when the hardware stopped answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Command byte transfer
    Command,
    /// Address transfer following a command
    Address,
    /// Data byte clocked out of the cache register
    Data,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Address => write!(f, "address"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Resource errors
    /// Mapping a chip's register window failed
    MapFailed {
        /// Index of the chip whose window could not be mapped
        chip: u8,
    },

    // Hardware errors
    /// The status register never reported idle within the poll budget
    HardwareTimeout {
        /// Chip the transaction was addressed to
        chip: u8,
        /// Transaction phase that timed out
        phase: Phase,
    },
    /// Another chip still has CE asserted
    ChipActive {
        /// Chip that is currently selected
        chip: u8,
    },

    // Address/size errors
    /// Address or page is beyond the end of the bank
    AddressOutOfBounds,
    /// Chip index is outside the bank
    InvalidChip,
    /// Provided buffer is too small for the operation
    BufferTooSmall,

    // Configuration errors
    /// Geometry or bank configuration is inconsistent
    InvalidGeometry,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MapFailed { chip } => {
                write!(f, "failed to map register window of chip {}", chip)
            }
            Self::HardwareTimeout { chip, phase } => {
                write!(f, "chip {} timed out during {} transfer", chip, phase)
            }
            Self::ChipActive { chip } => write!(f, "chip {} is still selected", chip),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::InvalidChip => write!(f, "invalid chip index"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::InvalidGeometry => write!(f, "invalid flash geometry"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
