//! Erase command implementation

use s25fl_core::flash::Flash;
use s25fl_core::programmer::{SpiPort, TickSource};
use s25fl_core::Error;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Sector-aligned span `[start, end)` covering `[address, address + length)`
pub(super) fn sector_span(address: u32, length: usize, sector_size: u32) -> (u32, u32) {
    let sector = sector_size as u64;
    let start = address as u64 / sector * sector;
    if length == 0 {
        return (start as u32, start as u32);
    }
    let end = (address as u64 + length as u64).div_ceil(sector) * sector;
    (start as u32, end.min(u32::MAX as u64) as u32)
}

/// Erase a sector-aligned region, one sector at a time
pub fn run_erase<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    length: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = flash.config().geometry;
    if !geometry.is_sector_aligned(address) || length % geometry.sector_size as usize != 0 {
        return Err(format!(
            "Erase region 0x{:08X}+0x{:X} is not aligned to the {} byte sector size",
            address, length, geometry.sector_size
        )
        .into());
    }
    if !geometry.contains(address, length) {
        return Err(Error::AddressOutOfRange.into());
    }

    erase_sectors(flash, address, length)?;
    println!("Erased {} bytes at 0x{:08X}", length, address);
    Ok(())
}

/// Erase whole sectors with a progress bar
pub(super) fn erase_sectors<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    length: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let sector_size = flash.config().geometry.sector_size;
    let sectors = length / sector_size as usize;

    let pb = ProgressBar::new(sectors as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sectors Erasing")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for i in 0..sectors {
        let sector_addr = address + (i as u32) * sector_size;
        if let Err(partial) = flash.erase_range(sector_addr, sector_size as usize) {
            pb.abandon_with_message("Erase failed");
            return Err(format!(
                "Erase failed at 0x{:08X} after {} sectors: {}",
                sector_addr, i, partial.error
            )
            .into());
        }
        pb.set_position((i + 1) as u64);
    }

    pb.finish_with_message("Erase complete");
    Ok(())
}

/// Erase the whole chip
pub fn run_bulk_erase<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Erasing whole chip...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = flash.bulk_erase();
    match result {
        Ok(()) => pb.finish_with_message("Chip erase complete"),
        Err(_) => pb.abandon_with_message("Chip erase failed"),
    }
    result?;
    Ok(())
}
