//! scai-nand-mmio - `/dev/mem` backend for the SCAI SPI NAND bank
//!
//! This crate maps the eight register windows of the SCAI controller from
//! physical memory and hands them to the core driver. It needs root and a
//! kernel that allows `/dev/mem` access to the APB range.
//!
//! # Example
//!
//! ```ignore
//! use scai_nand_mmio::{open, MmioOptions};
//!
//! let mut bank = open(&MmioOptions::default())?;
//! let mut page = vec![0u8; 4096];
//! bank.read_page(0, &mut page, None)?;
//! ```

pub mod error;
pub mod mapper;
pub mod physmap;

use std::path::PathBuf;

use scai_nand_core::{BankConfig, ScaiNand, SCAI_CHIP_COUNT};

pub use error::{MmioError, Result};
pub use mapper::{DevMemMapper, DEV_MEM};
pub use physmap::PhysMap;

/// A bank driven through `/dev/mem`
pub type MmioNand = ScaiNand<PhysMap>;

/// Options for the MMIO backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmioOptions {
    /// Physical memory device
    pub dev: PathBuf,
    /// Optional TOML bank configuration
    pub config: Option<PathBuf>,
    /// Override of the poll budget
    pub max_polls: Option<u32>,
}

impl Default for MmioOptions {
    fn default() -> Self {
        Self {
            dev: PathBuf::from(DEV_MEM),
            config: None,
            max_polls: None,
        }
    }
}

impl MmioOptions {
    /// Parse `key=value` backend options
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        let mut opts = Self::default();

        for (key, value) in options {
            match *key {
                "dev" => opts.dev = PathBuf::from(value),
                "config" => opts.config = Some(PathBuf::from(value)),
                "max_polls" => {
                    let polls = value.parse().map_err(|_| MmioError::InvalidParameter {
                        name: "max_polls",
                        message: format!("'{}' is not a number", value),
                    })?;
                    opts.max_polls = Some(polls);
                }
                _ => {
                    log::warn!("Unknown mmio option: {}={}", key, value);
                }
            }
        }

        Ok(opts)
    }
}

/// Map the bank and bring it up
pub fn open(options: &MmioOptions) -> Result<MmioNand> {
    let mut config = match &options.config {
        Some(path) => BankConfig::from_toml_file(path)?,
        None => BankConfig::scai(),
    };
    if let Some(max_polls) = options.max_polls {
        config.poll.max_polls = max_polls;
    }
    open_with_config(&options.dev, config)
}

/// Map a bank described by `config` through the memory device at `dev`
pub fn open_with_config(
    dev: impl Into<PathBuf>,
    config: BankConfig<SCAI_CHIP_COUNT>,
) -> Result<MmioNand> {
    let mut mapper = DevMemMapper::new(dev);
    ScaiNand::init(config, &mut mapper).map_err(|e| match mapper.take_error() {
        Some(os_error) => os_error,
        None => MmioError::Bank(e),
    })
}
