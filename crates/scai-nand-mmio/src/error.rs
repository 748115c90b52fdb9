//! Error types for the MMIO backend

use std::io;
use std::path::PathBuf;

use scai_nand_core::config::ConfigError;
use thiserror::Error;

/// MMIO backend errors
#[derive(Debug, Error)]
pub enum MmioError {
    /// Opening the physical memory device failed
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// mmap of a register window failed
    #[error("Failed to map {size:#x} bytes at {address:#010x}: {source}")]
    Map {
        address: u64,
        size: usize,
        #[source]
        source: io::Error,
    },

    /// Physical memory access is not available on this platform
    #[error("Not supported: {0}")]
    NotSupported(&'static str),

    /// Invalid backend parameter
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Bank configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The driver core rejected the bank
    #[error("{0}")]
    Bank(#[from] scai_nand_core::Error),
}

/// Result type for MMIO backend operations
pub type Result<T> = std::result::Result<T, MmioError>;
