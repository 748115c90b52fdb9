//! Backend registry
//!
//! A backend is selected with a string of the form `name[:key=value,...]`,
//! for example `mmio:dev=/dev/mem` or `dummy:pattern=yes`.

use std::collections::HashMap;
use std::path::Path;

use scai_nand_core::config::ConfigError;
use scai_nand_core::NandDevice;
use thiserror::Error;

/// Errors from opening a backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend of that name is compiled in
    #[error("Unknown backend: {0}")]
    Unknown(String),

    /// Malformed backend string or option
    #[error("{0}")]
    InvalidParameter(String),

    /// Bank configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The driver core rejected the bank
    #[error("{0}")]
    Device(#[from] scai_nand_core::Error),

    /// The MMIO backend failed
    #[cfg(feature = "mmio")]
    #[error(transparent)]
    Mmio(#[from] scai_nand_mmio::MmioError),
}

/// Information about a backend
pub struct BackendInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub options: &'static str,
}

/// Get list of available backends based on enabled features
pub fn available_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = Vec::new();

    #[cfg(feature = "mmio")]
    backends.push(BackendInfo {
        name: "mmio",
        description: "SCAI controller registers mapped through /dev/mem",
        options: "dev=<path>, config=<file>, max_polls=<n>",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "Register-level emulator of the bank for testing",
        options: "fill=<byte>, pattern=<yes|no>, busy=<n>, max_polls=<n>",
    });

    backends
}

/// Comma-separated backend names for help text
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// A parsed backend string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendParams {
    pub name: String,
    pub params: HashMap<String, String>,
}

impl BackendParams {
    /// Options as borrowed key/value pairs, sorted by key
    pub fn options(&self) -> Vec<(&str, &str)> {
        let mut opts: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        opts.sort();
        opts
    }
}

/// Parse a backend string like `mmio:dev=/dev/mem,max_polls=1000`
pub fn parse_backend_params(s: &str) -> Result<BackendParams, BackendError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(BackendError::InvalidParameter(format!(
                    "Invalid parameter format: '{}' (expected key=value)",
                    opt
                )));
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Open a backend and return the bank as a device
///
/// `config` is the global configuration file; a `config=` backend option
/// takes precedence over it.
pub fn open_device(
    backend: &str,
    config: Option<&Path>,
) -> Result<Box<dyn NandDevice>, BackendError> {
    let params = parse_backend_params(backend)?;
    log::debug!("Opening backend '{}'", params.name);

    match params.name.as_str() {
        #[cfg(feature = "mmio")]
        "mmio" => open_mmio(&params, config),

        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params, config),

        _ => Err(BackendError::Unknown(params.name)),
    }
}

#[cfg(feature = "mmio")]
fn open_mmio(
    params: &BackendParams,
    config: Option<&Path>,
) -> Result<Box<dyn NandDevice>, BackendError> {
    let mut options = scai_nand_mmio::MmioOptions::from_options(&params.options())?;
    if options.config.is_none() {
        options.config = config.map(Path::to_path_buf);
    }

    log::info!("Mapping SCAI register windows through {}", options.dev.display());
    let bank = scai_nand_mmio::open(&options)?;
    Ok(Box::new(bank))
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &BackendParams,
    config: Option<&Path>,
) -> Result<Box<dyn NandDevice>, BackendError> {
    use scai_nand_core::BankConfig;
    use scai_nand_dummy::{DummyBoard, DummyConfig};

    let mut dummy =
        DummyConfig::from_options(&params.options()).map_err(BackendError::InvalidParameter)?;
    if let Some(path) = config {
        dummy.geometry = BankConfig::from_toml_file(path)?.geometry;
    }

    let mut board = DummyBoard::new(dummy);
    let bank = board.open()?;
    Ok(Box::new(bank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let params = parse_backend_params("mmio:dev=/dev/mem,max_polls=10").unwrap();
        assert_eq!(params.name, "mmio");
        assert_eq!(params.options(), [("dev", "/dev/mem"), ("max_polls", "10")]);

        let params = parse_backend_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());

        assert!(matches!(
            parse_backend_params("dummy:pattern"),
            Err(BackendError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unknown_backend() {
        assert!(matches!(
            open_device("ch341a", None),
            Err(BackendError::Unknown(name)) if name == "ch341a"
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        let mut device = open_device("dummy:fill=0x5a", None).unwrap();
        assert_eq!(device.info().write_size, 4096);

        let mut buf = [0u8; 8];
        device.read(0x4000_0000, &mut buf).unwrap();
        assert_eq!(buf, [0x5A; 8]);
    }
}
