//! Sector and bulk erase

use super::{send, wait_ready, write_enable};
use crate::config::FlashConfig;
use crate::error::{Error, PartialWrite, Result};
use crate::programmer::{SpiPort, TickSource};
use crate::spi::{opcodes, AddressWidth, CommandFrame};

/// Send a sector erase command for the sector containing `addr`
///
/// The caller must have sent [`write_enable`] immediately before; the latch
/// clears after every erase or program cycle. Returns as soon as the command
/// is sent, use [`wait_ready`] to wait for the erase to finish.
pub fn erase_sector<P: SpiPort + ?Sized>(
    port: &mut P,
    addr: u32,
    width: AddressWidth,
) -> Result<()> {
    if !width.fits(addr) {
        return Err(Error::AddressOutOfRange);
    }
    log::debug!("spi: erase sector at 0x{:08X}", addr);
    send(port, &CommandFrame::erase(opcodes::erase_opcode(width), addr, width))
}

/// Write-enable, erase one sector and wait for it to finish
pub fn erase_sector_blocking<P, C>(
    port: &mut P,
    clock: &C,
    config: &FlashConfig,
    addr: u32,
) -> Result<()>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    if !config.geometry.contains(addr, 1) || !config.address_width.fits(addr) {
        return Err(Error::AddressOutOfRange);
    }
    write_enable(port)?;
    erase_sector(port, addr, config.address_width)?;
    wait_ready(port, clock, config.timeouts.erase_ms)
}

/// Erase every sector in `[start, start + len)`
///
/// Both `start` and `len` must be multiples of a non-zero sector size,
/// otherwise nothing is sent and [`Error::InvalidAlignment`] is reported.
/// Sectors are erased one at a time in increasing order. Returns the number of bytes
/// erased; on failure the [`PartialWrite`] reports the bytes already erased.
pub fn erase_range<P, C>(
    port: &mut P,
    clock: &C,
    config: &FlashConfig,
    start: u32,
    len: usize,
) -> core::result::Result<usize, PartialWrite>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    let geometry = &config.geometry;
    let sector = geometry.sector_size as usize;
    if !geometry.is_sector_aligned(start) || len % sector != 0 {
        return Err(PartialWrite::new(0, Error::InvalidAlignment));
    }
    if !geometry.contains(start, len) {
        return Err(PartialWrite::new(0, Error::AddressOutOfRange));
    }

    let mut erased = 0;
    while erased < len {
        let addr = start + erased as u32;
        if let Err(e) = erase_sector_blocking(port, clock, config, addr) {
            log::error!("spi: erase failed at 0x{:08X}: {}", addr, e);
            return Err(PartialWrite::new(erased, e));
        }
        erased += sector;
    }

    Ok(erased)
}

/// Erase the whole array
///
/// Sends write-enable itself and waits up to `timeout_ms`.
pub fn bulk_erase<P, C>(port: &mut P, clock: &C, timeout_ms: u32) -> Result<()>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    log::info!("spi: bulk erase");
    write_enable(port)?;
    send(port, &CommandFrame::simple(opcodes::BE))?;
    wait_ready(port, clock, timeout_ms)
}
