//! Read command implementation

use indicatif::{ProgressBar, ProgressStyle};
use scai_nand_core::NandDevice;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Bytes read per device call
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Run the read command
///
/// Reads `length` bytes from `start` (default: to the end of the bank) and
/// streams them to `output`.
pub fn run_read(
    device: &mut dyn NandDevice,
    output: &Path,
    start: u64,
    length: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = device.info().size;
    let length = match length {
        Some(len) => len,
        None => size.checked_sub(start).ok_or_else(|| {
            format!("Start address {:#x} is beyond the bank ({:#x})", start, size)
        })?,
    };
    if !device.is_valid_range(start, length) {
        return Err(format!(
            "Range {:#x}+{:#x} exceeds the bank size {:#x}",
            start, length, size
        )
        .into());
    }

    println!("Reading {} bytes at {:#x}...", length, start);

    let mut writer = BufWriter::new(File::create(output)?);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut done = 0u64;
    while done < length {
        let len = std::cmp::min(READ_CHUNK_SIZE as u64, length - done) as usize;
        let buf = &mut chunk[..len];

        device.read(start + done, buf)?;
        writer.write_all(buf)?;

        done += len as u64;
        pb.set_position(done);
    }
    writer.flush()?;

    pb.finish_with_message("Read complete");
    println!("Wrote {} bytes to {:?}", length, output);
    Ok(())
}

/// Run the read-page command
pub fn run_read_page(
    device: &mut dyn NandDevice,
    page: u32,
    output: &Path,
    with_oob: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = device.info();
    let mut main = vec![0u8; info.write_size as usize];
    let mut oob = vec![0u8; info.oob_size as usize];

    if with_oob {
        device.read_page(page, &mut main, Some(&mut oob[..]))?;
        main.extend_from_slice(&oob);
    } else {
        device.read_page(page, &mut main, None)?;
    }

    File::create(output)?.write_all(&main)?;
    println!(
        "Wrote page {}{} ({} bytes) to {:?}",
        page,
        if with_oob { " with OOB" } else { "" },
        main.len(),
        output
    );
    Ok(())
}
