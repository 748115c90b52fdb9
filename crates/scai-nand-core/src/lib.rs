//! scai-nand-core - Core library for the SCAI SPI NAND bank
//!
//! This crate drives a bank of discrete SPI NAND chips, each sitting behind
//! its own memory-mapped register window, and presents them as a single
//! linear, read-only flash device. It is designed to be `no_std` compatible
//! so the same code can run in a bootloader or on a Linux host through
//! `/dev/mem`.
//!
//! # Features
//!
//! - `std` - Enable standard library support (TOML configuration loading,
//!   `std::error::Error` impls)
//!
//! # Example
//!
//! ```ignore
//! use scai_nand_core::{BankConfig, ScaiNand};
//!
//! fn dump_first_page<M: WindowMapper>(mapper: &mut M) -> Result<()> {
//!     let mut bank = ScaiNand::init(BankConfig::scai(), mapper)?;
//!     let mut page = [0u8; 4096];
//!     let mut oob = [0u8; 256];
//!     bank.read_page(0, &mut page, Some(&mut oob))?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod address;
pub mod bank;
pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
pub mod regs;
pub mod window;

pub use address::{ChipIndex, ChipOffset};
pub use bank::{ChipContext, NandBank, ScaiNand, Selected};
pub use config::{BankConfig, PollConfig};
pub use device::{DeviceInfo, EccMode, NandDevice, NandFeatures};
pub use error::{Error, Phase, Result};
pub use geometry::FlashGeometry;
pub use window::{RegisterWindow, WindowMapper};

/// Number of chips on the SCAI board
pub const SCAI_CHIP_COUNT: usize = 8;
