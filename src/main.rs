//! scai-nand - Read-only access to the SCAI SPI NAND bank
//!
//! The SCAI board carries eight discrete SPI NAND chips, each behind its
//! own memory-mapped register window. This tool presents them as one linear
//! read-only device.
//!
//! # Architecture
//!
//! Backends produce a `NandDevice`:
//! - **mmio** - The real controller, mapped through `/dev/mem`
//! - **dummy** - A register-level emulator, for testing without hardware
//!
//! The commands (info, read, read-page) only see the device trait.

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger, -v raises the default filter
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Info { backend } => {
            let device = backends::open_device(&backend, config)?;
            commands::run_info(device.as_ref())
        }
        Commands::Read {
            backend,
            output,
            start,
            length,
        } => {
            let mut device = backends::open_device(&backend, config)?;
            commands::run_read(device.as_mut(), &output, start, length)
        }
        Commands::ReadPage {
            backend,
            page,
            output,
            oob,
        } => {
            let mut device = backends::open_device(&backend, config)?;
            commands::run_read_page(device.as_mut(), page, &output, oob)
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}
