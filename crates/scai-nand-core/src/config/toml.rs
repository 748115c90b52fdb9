//! TOML configuration file parsing
//!
//! Every key is optional. Keys that are present override the values of a
//! base configuration (the SCAI board defaults for `BankConfig::from_toml_str`).

use std::fs;
use std::path::Path;
use std::string::String;
use std::vec::Vec;
use std::format;

use super::{BankConfig, ConfigError, PollConfig};
use crate::geometry::FlashGeometry;
use crate::SCAI_CHIP_COUNT;

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfigFile {
    window_size: Option<NumOrStr>,
    base_addresses: Option<Vec<NumOrStr>>,
    geometry: Option<TomlGeometry>,
    poll: Option<TomlPoll>,
}

/// Geometry overrides
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGeometry {
    page_size: Option<NumOrStr>,
    oob_size: Option<NumOrStr>,
    block_size: Option<NumOrStr>,
    chip_size: Option<NumOrStr>,
    chip_count: Option<u8>,
}

/// Poll budget overrides
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPoll {
    max_polls: Option<u32>,
    interval_us: Option<u32>,
}

/// A number given either as a TOML integer or as a string
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(u64),
    Str(String),
}

impl NumOrStr {
    fn value(&self, field: &'static str) -> Result<u64, ConfigError> {
        match self {
            NumOrStr::Int(n) => Ok(*n),
            NumOrStr::Str(s) => parse_size(s).map_err(|e| {
                log::debug!("{}: {}", field, e);
                ConfigError::InvalidValue(field)
            }),
        }
    }

    fn value_u32(&self, field: &'static str) -> Result<u32, ConfigError> {
        u32::try_from(self.value(field)?).map_err(|_| ConfigError::InvalidValue(field))
    }
}

/// Parse a size string like "4 KiB", "0x1000" or "4096"
fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();

    // Try plain number first
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }

    // Try hex
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|e| format!("invalid hex: {}", e));
    }

    // Try with suffix
    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("gib") {
        (n.trim(), 1u64 << 30)
    } else if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1 << 20)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1 << 10)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u64 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflows: {}", s))
}

impl BankConfig<SCAI_CHIP_COUNT> {
    /// Load a configuration file on top of the SCAI board defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|_| ConfigError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration on top of the SCAI board defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::scai().with_toml_str(content)
    }
}

impl<const N: usize> BankConfig<N> {
    /// Apply the keys of a TOML document to this configuration
    ///
    /// The result is validated before it is returned.
    pub fn with_toml_str(mut self, content: &str) -> Result<Self, ConfigError> {
        let file: TomlConfigFile = ::toml::from_str(content).map_err(|e| {
            log::debug!("TOML parse error: {}", e);
            ConfigError::ParseError
        })?;

        if let Some(size) = &file.window_size {
            self.window_size = size.value("window_size")? as usize;
        }

        if let Some(addresses) = &file.base_addresses {
            if addresses.len() != N {
                return Err(ConfigError::ChipCount {
                    expected: N,
                    found: addresses.len(),
                });
            }
            for (slot, addr) in self.base_addresses.iter_mut().zip(addresses) {
                *slot = addr.value("base_addresses")?;
            }
        }

        if let Some(g) = &file.geometry {
            self.geometry = apply_geometry(self.geometry, g)?;
        }

        if let Some(p) = &file.poll {
            self.poll = PollConfig {
                max_polls: p.max_polls.unwrap_or(self.poll.max_polls),
                interval_us: p.interval_us.unwrap_or(self.poll.interval_us),
            };
        }

        self.validate()?;
        Ok(self)
    }
}

fn apply_geometry(
    mut geometry: FlashGeometry,
    g: &TomlGeometry,
) -> Result<FlashGeometry, ConfigError> {
    if let Some(v) = &g.page_size {
        geometry.page_size = v.value_u32("geometry.page_size")?;
    }
    if let Some(v) = &g.oob_size {
        geometry.oob_size = v.value_u32("geometry.oob_size")?;
    }
    if let Some(v) = &g.block_size {
        geometry.block_size = v.value_u32("geometry.block_size")?;
    }
    if let Some(v) = &g.chip_size {
        geometry.chip_size = v.value("geometry.chip_size")?;
    }
    if let Some(count) = g.chip_count {
        geometry.chip_count = count;
    }
    Ok(geometry)
}
