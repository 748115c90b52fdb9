//! CLI command implementations
//!
//! Every command works on a `NandDevice`, so the same code runs against
//! the real bank and the emulator.

mod info;
mod list;
mod read;

pub use info::run_info;
pub use list::list_backends;
pub use read::{run_read, run_read_page};

/// Format a byte count for display
pub(crate) fn format_size(bytes: u64) -> String {
    if bytes >= 1 << 30 {
        format!("{} GiB", bytes >> 30)
    } else if bytes >= 1 << 20 {
        format!("{} MiB", bytes >> 20)
    } else if bytes >= 1 << 10 {
        format!("{} KiB", bytes >> 10)
    } else {
        format!("{} B", bytes)
    }
}
