//! Protocol implementations
//!
//! Command sequences for the S25FL family, built on top of the frame codec
//! and a caller supplied [`SpiPort`]. Every function takes the port by
//! `&mut`, so a single caller owns the bus for the whole sequence.
//!
//! Mutating operations follow the device's mandated sequence:
//!
//! ```text
//! Idle --write_enable()--> EnableSent --erase/program--> DeviceBusy
//! DeviceBusy --wait_ready()=Ready--> Idle
//! DeviceBusy --wait_ready()=TimedOut--> Failed
//! ```

mod erase;
mod ident;
#[cfg(test)]
pub(crate) mod mock;
mod program;
mod read;
mod ready;
mod status;

pub use erase::*;
pub use ident::*;
pub use program::*;
pub use read::*;
pub use ready::*;
pub use status::*;

use crate::error::{Error, Result};
use crate::programmer::SpiPort;
use crate::spi::{opcodes, CommandFrame, FrameBuf};

/// Spin until the transport reports the last exchange has drained
fn drain<P: SpiPort + ?Sized>(port: &P) {
    while port.is_busy() {
        core::hint::spin_loop();
    }
}

/// Encode `frame` and check it against the transport's transfer limit
fn encode_for<P: SpiPort + ?Sized>(port: &P, frame: &CommandFrame<'_>) -> Result<FrameBuf> {
    let tx = frame.encode()?;
    if tx.len() > port.max_transfer_len() {
        return Err(Error::FrameTooLong);
    }
    Ok(tx)
}

/// Send a command and discard whatever is clocked back
pub fn send<P: SpiPort + ?Sized>(port: &mut P, frame: &CommandFrame<'_>) -> Result<()> {
    let tx = encode_for(port, frame)?;
    log::trace!("spi: send opcode 0x{:02X} ({} bytes)", frame.opcode, tx.len());
    port.exchange(&tx, None)?;
    drain(port);
    Ok(())
}

/// Exchange a command and return the raw receive buffer, echo bytes included
pub fn transfer<P: SpiPort + ?Sized>(port: &mut P, frame: &CommandFrame<'_>) -> Result<FrameBuf> {
    let tx = encode_for(port, frame)?;
    let mut rx = FrameBuf::new();
    rx.resize(tx.len(), 0).map_err(|_| Error::FrameTooLong)?;

    log::trace!("spi: exchange opcode 0x{:02X} ({} bytes)", frame.opcode, tx.len());
    port.exchange(&tx, Some(&mut rx))?;
    drain(port);
    Ok(rx)
}

/// Exchange a read-type command and copy its response into `out`
///
/// `frame.response_len` must equal `out.len()`.
pub fn query<P: SpiPort + ?Sized>(
    port: &mut P,
    frame: &CommandFrame<'_>,
    out: &mut [u8],
) -> Result<()> {
    let rx = transfer(port, frame)?;
    let response = frame.response(&rx)?;
    if response.len() != out.len() {
        return Err(Error::FrameTooShort);
    }
    out.copy_from_slice(response);
    Ok(())
}

/// Send the Write Enable command
///
/// Does not read the latch back; use [`check_wel`] when the guarantee is
/// needed.
pub fn write_enable<P: SpiPort + ?Sized>(port: &mut P) -> Result<()> {
    send(port, &CommandFrame::simple(opcodes::WREN))
}

/// Send the Write Disable command
pub fn write_disable<P: SpiPort + ?Sized>(port: &mut P) -> Result<()> {
    send(port, &CommandFrame::simple(opcodes::WRDI))
}

/// Send the software reset command
///
/// Returns the device to its power-on state: legacy SPI mode, no pending
/// operation. Reset takes about 30us to complete.
pub fn software_reset<P: SpiPort + ?Sized>(port: &mut P) -> Result<()> {
    log::debug!("spi: software reset");
    send(port, &CommandFrame::simple(opcodes::RESET))
}

/// Send Mode Bit Reset to leave continuous read mode
pub fn mode_bit_reset<P: SpiPort + ?Sized>(port: &mut P) -> Result<()> {
    send(port, &CommandFrame::simple(opcodes::MBR))
}
