//! Read command implementation

use super::{progress_bar, CHUNK_SIZE};
use s25fl_core::flash::Flash;
use s25fl_core::programmer::{SpiPort, TickSource};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Read `length` bytes from `address` into `output`
pub fn run_read<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    length: usize,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_with_progress(flash, address, length)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);
    Ok(())
}

/// Read a region with a progress bar
fn read_with_progress<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    length: usize,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if !flash.config().geometry.contains(address, length) {
        return Err(format!(
            "Region 0x{:08X}+0x{:X} exceeds flash size ({} bytes)",
            address,
            length,
            flash.config().geometry.total_size
        )
        .into());
    }

    let mut data = vec![0u8; length];
    let pb = progress_bar(length as u64, "Reading");

    for (i, chunk) in data.chunks_mut(CHUNK_SIZE).enumerate() {
        let offset = i * CHUNK_SIZE;
        flash.read(address + offset as u32, chunk)?;
        pb.set_position((offset + chunk.len()) as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
