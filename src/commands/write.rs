//! Write and verify command implementation

use super::erase::{erase_sectors, sector_span};
use super::{progress_bar, CHUNK_SIZE};
use s25fl_core::flash::Flash;
use s25fl_core::programmer::{SpiPort, TickSource};
use s25fl_core::Error;
use std::fs;
use std::path::Path;

/// Write `input` to flash at `address`
pub fn run_write<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    input: &Path,
    no_erase: bool,
    no_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    println!("Read {} bytes from {:?}", data.len(), input);

    write_data(flash, address, &data, !no_erase, !no_verify)?;
    println!("Write complete!");
    Ok(())
}

/// Compare flash at `address` against `input`
pub fn run_verify<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    check_region(flash, address, data.len())?;
    verify_with_progress(flash, address, &data)?;
    println!("Verification passed");
    Ok(())
}

fn check_region<P: SpiPort, C: TickSource>(
    flash: &Flash<P, C>,
    address: u32,
    length: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry = flash.config().geometry;
    if !geometry.contains(address, length) {
        return Err(format!(
            "Data size ({} bytes at 0x{:08X}) exceeds chip size ({} bytes)",
            length, address, geometry.total_size
        )
        .into());
    }
    Ok(())
}

/// Erase (optionally), program and verify (optionally) one region
fn write_data<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    data: &[u8],
    erase: bool,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_region(flash, address, data.len())?;
    if data.is_empty() {
        return Ok(());
    }

    if erase {
        let sector_size = flash.config().geometry.sector_size;
        let (start, end) = sector_span(address, data.len(), sector_size);
        if start != address || end as u64 != address as u64 + data.len() as u64 {
            log::warn!(
                "Erasing 0x{:08X}..0x{:08X}; data outside 0x{:08X}+0x{:X} in those sectors is lost",
                start,
                end,
                address,
                data.len()
            );
        }
        erase_sectors(flash, start, (end - start) as usize)?;
    }

    program_with_progress(flash, address, data)?;

    if verify {
        verify_with_progress(flash, address, data)?;
    }
    Ok(())
}

fn program_with_progress<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = progress_bar(data.len() as u64, "Writing");

    for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
        let offset = i * CHUNK_SIZE;
        if let Err(partial) = flash.program(address + offset as u32, chunk) {
            pb.abandon_with_message("Write failed");
            let committed = offset + partial.committed;
            return Err(format!(
                "Write failed at 0x{:08X} ({} of {} bytes written): {}",
                address as usize + committed,
                committed,
                data.len(),
                partial.error
            )
            .into());
        }
        pb.set_position((offset + chunk.len()) as u64);
    }

    pb.finish_with_message("Write complete");
    Ok(())
}

fn verify_with_progress<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
    address: u32,
    expected: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = progress_bar(expected.len() as u64, "Verifying");

    for (i, chunk) in expected.chunks(CHUNK_SIZE).enumerate() {
        let offset = i * CHUNK_SIZE;
        match flash.verify(address + offset as u32, chunk) {
            Ok(()) => pb.set_position((offset + chunk.len()) as u64),
            Err(Error::VerifyMismatch { address: at }) => {
                pb.abandon_with_message("Verification failed!");
                let index = (at - address) as usize;
                return Err(format!(
                    "Verification failed at 0x{:08X}: expected 0x{:02X}",
                    at, expected[index]
                )
                .into());
            }
            Err(e) => {
                pb.abandon_with_message("Verification failed!");
                return Err(e.into());
            }
        }
    }

    pb.finish_with_message("Verification passed");
    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use s25fl_core::programmer::StdClock;
    use s25fl_core::FlashConfig;
    use s25fl_dummy::{DummyConfig, DummyFlash};

    const SECTOR: usize = 0x40000;

    fn dummy_flash(config: DummyConfig) -> Flash<DummyFlash, StdClock> {
        let flash_config = FlashConfig::default().with_geometry(config.geometry());
        Flash::new(DummyFlash::new(config), StdClock::new(), flash_config)
    }

    fn small() -> DummyConfig {
        DummyConfig {
            size: 4 * SECTOR,
            ..Default::default()
        }
    }

    #[test]
    fn test_write_erases_programs_and_verifies() {
        let mut flash = dummy_flash(small());
        flash.port_mut().data_mut()[SECTOR..2 * SECTOR].fill(0x00);

        let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        write_data(&mut flash, SECTOR as u32 + 0x10, &data, true, true).unwrap();

        let (dummy, _) = flash.into_inner();
        assert_eq!(&dummy.data()[SECTOR + 0x10..SECTOR + 0x10 + data.len()], &data[..]);
        // The rest of the covered sector was erased
        assert_eq!(dummy.data()[SECTOR], 0xFF);
    }

    #[test]
    fn test_write_without_erase_fails_verify() {
        let mut flash = dummy_flash(small());
        flash.port_mut().data_mut()[..16].fill(0x00);

        let err = write_data(&mut flash, 0, &[0xAA; 16], false, true).unwrap_err();
        assert!(err.to_string().contains("0x00000000"));
    }

    #[test]
    fn test_write_reports_partial_progress() {
        let mut flash = dummy_flash(DummyConfig {
            stall_program: Some(20),
            ..small()
        });
        let mut config = *flash.config();
        config.timeouts.program_ms = 5;
        let (port, clock) = flash.into_inner();
        let mut flash = Flash::new(port, clock, config);

        let err = write_data(&mut flash, 0, &[0u8; 8192], true, false).unwrap_err();
        // 19 pages completed before the stalled one
        assert!(err.to_string().contains("4864 of 8192 bytes written"));
    }

    #[test]
    fn test_write_rejects_oversized_data() {
        let mut flash = dummy_flash(small());
        let data = vec![0u8; 16];
        assert!(write_data(&mut flash, (4 * SECTOR - 8) as u32, &data, true, true).is_err());
        assert!(flash.port_mut().command_log().is_empty());
    }
}
