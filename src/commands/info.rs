//! Info command implementation

use scai_nand_core::{EccMode, NandDevice, NandFeatures};

use super::format_size;

/// Print geometry, capabilities and register windows of a device
pub fn run_info(device: &dyn NandDevice) -> Result<(), Box<dyn std::error::Error>> {
    let info = device.info();

    println!("Size:        {} ({} bytes)", format_size(info.size), info.size);
    println!("Chips:       {}", info.chip_count);
    println!("Page size:   {} bytes + {} OOB", info.write_size, info.oob_size);
    println!(
        "Erase block: {} ({} pages)",
        format_size(info.erase_size as u64),
        info.erase_size / info.write_size
    );
    println!("Pages:       {}", info.page_count());
    println!("Blocks:      {}", info.block_count());

    let ecc = match info.ecc {
        EccMode::None => "none",
    };
    println!("ECC:         {}", ecc);

    let mut caps = Vec::new();
    if info.features.contains(NandFeatures::READ_ONLY) {
        caps.push("read-only");
    }
    if info.features.contains(NandFeatures::NO_SUBPAGE_WRITE) {
        caps.push("no-subpage-write");
    }
    if info.features.contains(NandFeatures::SINGLE_WIRE) {
        caps.push("single-wire");
    }
    if info.features.contains(NandFeatures::OOB) {
        caps.push("oob");
    }
    println!("Features:    {}", caps.join(", "));

    println!();
    println!("{:<6} {:>12} {:>14}", "Chip", "Window", "Range");
    let chip_size = info.size / info.chip_count as u64;
    for chip in 0..info.chip_count as usize {
        if let Some(base) = device.chip_base_address(chip) {
            let start = chip as u64 * chip_size;
            println!("M{:<5} {:>#12x} {:>#14x}", chip, base, start);
        }
    }

    Ok(())
}
