//! Bank configuration
//!
//! All board constants (window base addresses, window length, geometry and
//! polling budget) live in one immutable [`BankConfig`] built at start-up.
//! With the `std` feature it can also be loaded from a TOML file:
//!
//! ```toml
//! window_size = 0x100
//! base_addresses = [0x70000400, 0x70000410, 0x70000420, 0x70000430,
//!                   0x70000500, 0x70000510, 0x70000520, 0x70000530]
//!
//! [geometry]
//! page_size = "4 KiB"
//! oob_size = 256
//! block_size = "256 KiB"
//! chip_size = "1 GiB"
//!
//! [poll]
//! max_polls = 1000000
//! interval_us = 1
//! ```

use core::fmt;

use crate::error::Error;
use crate::geometry::FlashGeometry;
use crate::regs::{REG_STATUS, SCAI_BASE_ADDRESSES, WINDOW_SIZE};
use crate::SCAI_CHIP_COUNT;

#[cfg(feature = "std")]
mod toml;

/// Bounded busy-poll settings for the status register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Status reads before a transfer is declared timed out
    pub max_polls: u32,
    /// Delay between two status reads in microseconds
    pub interval_us: u32,
}

impl PollConfig {
    /// Roughly one second at one microsecond per poll
    pub const DEFAULT: Self = Self {
        max_polls: 1_000_000,
        interval_us: 1,
    };
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Immutable description of a bank of `N` chips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankConfig<const N: usize> {
    /// Bus address of each chip's register window
    pub base_addresses: [u64; N],
    /// Length of each register window
    pub window_size: usize,
    /// Flash geometry
    pub geometry: FlashGeometry,
    /// Status polling budget
    pub poll: PollConfig,
}

impl BankConfig<SCAI_CHIP_COUNT> {
    /// The SCAI board: eight MT29F8G01 chips on the APB bus
    pub const fn scai() -> Self {
        Self {
            base_addresses: SCAI_BASE_ADDRESSES,
            window_size: WINDOW_SIZE,
            geometry: FlashGeometry::MT29F8G01,
            poll: PollConfig::DEFAULT,
        }
    }
}

impl Default for BankConfig<SCAI_CHIP_COUNT> {
    fn default() -> Self {
        Self::scai()
    }
}

impl<const N: usize> BankConfig<N> {
    /// Check the configuration against the bank size `N`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate().map_err(ConfigError::Geometry)?;

        if self.geometry.chip_count as usize != N {
            return Err(ConfigError::ChipCount {
                expected: N,
                found: self.geometry.chip_count as usize,
            });
        }
        if self.window_size < REG_STATUS + 4 {
            return Err(ConfigError::InvalidValue("window_size"));
        }
        if self.poll.max_polls == 0 {
            return Err(ConfigError::InvalidValue("poll.max_polls"));
        }
        Ok(())
    }
}

/// Errors from building or loading a bank configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O error while reading the configuration file
    IoError,
    /// The file is not valid TOML or has unexpected keys
    ParseError,
    /// Number of chips does not match the bank
    ChipCount {
        /// Chips in the bank
        expected: usize,
        /// Chips described by the configuration
        found: usize,
    },
    /// A field holds an unusable value
    InvalidValue(&'static str),
    /// The geometry is inconsistent
    Geometry(Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "failed to read configuration file"),
            Self::ParseError => write!(f, "failed to parse configuration"),
            Self::ChipCount { expected, found } => {
                write!(f, "configuration describes {} chips, bank has {}", found, expected)
            }
            Self::InvalidValue(field) => write!(f, "invalid value for '{}'", field),
            Self::Geometry(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scai_defaults_are_valid() {
        let config = BankConfig::scai();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_addresses[0], 0x7000_0400);
        assert_eq!(config.base_addresses[7], 0x7000_0530);
        assert_eq!(config.window_size, 0x100);
    }

    #[test]
    fn test_chip_count_must_match_bank() {
        let config = BankConfig::<4> {
            base_addresses: [0x1000, 0x2000, 0x3000, 0x4000],
            window_size: 0x100,
            geometry: FlashGeometry::MT29F8G01,
            poll: PollConfig::DEFAULT,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ChipCount {
                expected: 4,
                found: 8
            })
        );
    }

    #[test]
    fn test_window_too_small() {
        let mut config = BankConfig::scai();
        config.window_size = 0x0C;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue("window_size"))
        );
    }
}
