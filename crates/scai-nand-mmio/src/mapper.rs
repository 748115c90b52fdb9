//! Window mapper backed by `/dev/mem`

use std::path::PathBuf;

use scai_nand_core::{ChipIndex, Error, WindowMapper};

use crate::error::MmioError;
use crate::physmap::PhysMap;

/// Default physical memory device
pub const DEV_MEM: &str = "/dev/mem";

/// Maps each chip's register window from a physical memory device
#[derive(Debug)]
pub struct DevMemMapper {
    path: PathBuf,
    last_error: Option<MmioError>,
}

impl DevMemMapper {
    /// Create a mapper for the given memory device
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_error: None,
        }
    }

    /// The underlying OS error of the most recent failed mapping
    pub fn take_error(&mut self) -> Option<MmioError> {
        self.last_error.take()
    }
}

impl Default for DevMemMapper {
    fn default() -> Self {
        Self::new(DEV_MEM)
    }
}

impl WindowMapper for DevMemMapper {
    type Window = PhysMap;

    fn map(&mut self, chip: ChipIndex, base: u64, len: usize) -> scai_nand_core::Result<PhysMap> {
        match PhysMap::new(&self.path, base, len) {
            Ok(map) => Ok(map),
            Err(e) => {
                log::error!("{}: {}", chip, e);
                self.last_error = Some(e);
                Err(Error::MapFailed { chip: chip.raw() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scai_nand_core::{BankConfig, ScaiNand};

    #[test]
    fn test_failed_open_keeps_os_error() {
        let mut mapper = DevMemMapper::new("/nonexistent/scai-nand-mem");
        let result = ScaiNand::init(BankConfig::scai(), &mut mapper);

        assert!(matches!(result, Err(Error::MapFailed { chip: 0 })));
        assert!(mapper.take_error().is_some());
        assert!(mapper.take_error().is_none());
    }
}
