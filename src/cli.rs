//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u64
fn parse_hex_u64(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u64>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a page number as hex or decimal
fn parse_page(s: &str) -> Result<u32, String> {
    let page = parse_hex_u64(s)?;
    u32::try_from(page).map_err(|_| format!("Page number too large: {}", s))
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, optionally with key=value options [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "scai-nand")]
#[command(author, version, about = "Read-only driver for the SCAI SPI NAND bank", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bank configuration file (TOML format)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show bank geometry and capabilities
    Info {
        #[arg(short, long, help = backend_help())]
        backend: String,
    },

    /// Read a byte range of the bank to a file
    Read {
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x40000000)
        #[arg(long, value_parser = parse_hex_u64, default_value = "0")]
        start: u64,

        /// Number of bytes to read (default: up to the end of the bank)
        #[arg(long, value_parser = parse_hex_u64)]
        length: Option<u64>,
    },

    /// Read a single page to a file
    ReadPage {
        #[arg(short, long, help = backend_help())]
        backend: String,

        /// Page number
        #[arg(short, long, value_parser = parse_page)]
        page: u32,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Append the OOB area after the page data
        #[arg(long)]
        oob: bool,
    },

    /// List supported backends
    ListBackends,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x40000000"), Ok(0x4000_0000));
        assert_eq!(parse_hex_u64("4096"), Ok(4096));
        assert!(parse_hex_u64("0xzz").is_err());
        assert!(parse_page("0x100000000").is_err());
    }

    #[test]
    fn test_read_page_args() {
        let cli = Cli::parse_from([
            "scai-nand", "-vv", "read-page", "-b", "dummy", "-p", "262144", "-o", "page.bin",
            "--oob",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::ReadPage {
                backend, page, oob, ..
            } => {
                assert_eq!(backend, "dummy");
                assert_eq!(page, 262_144);
                assert!(oob);
            }
            _ => panic!("expected read-page"),
        }
    }
}
