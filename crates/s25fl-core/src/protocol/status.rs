//! Status register access
//!
//! The status register is read fresh on every call. The device updates it
//! on its own as erase and program cycles finish, so a cached value is
//! never trustworthy.

use bitflags::bitflags;

use super::{query, send, wait_ready, write_enable};
use crate::error::Result;
use crate::programmer::{SpiPort, TickSource};
use crate::spi::{opcodes, CommandFrame};

bitflags! {
    /// Status Register 1
    ///
    /// Only WIP and WEL drive the protocol; the remaining bits are kept so
    /// they can be logged, but are otherwise ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Write In Progress: an erase or program is executing
        const WIP = opcodes::SR1_WIP;
        /// Write Enable Latch: the next mutating command will be accepted
        const WEL = opcodes::SR1_WEL;
        /// Erase Error
        const E_ERR = opcodes::SR1_E_ERR;
        /// Program Error
        const P_ERR = opcodes::SR1_P_ERR;

        // Block protect and SRWD bits
        const _ = !0;
    }
}

impl StatusRegister {
    /// Bit 0 set: the device is still busy
    pub fn is_write_in_progress(&self) -> bool {
        self.contains(Self::WIP)
    }

    /// Bit 1 set: write enable latch is armed
    pub fn is_write_enable_latched(&self) -> bool {
        self.contains(Self::WEL)
    }
}

/// Read Status Register 1
///
/// Sends `[RDSR1, 0xFF]` and returns the second byte clocked back.
pub fn read_status<P: SpiPort + ?Sized>(port: &mut P) -> Result<StatusRegister> {
    let mut buf = [0u8; 1];
    query(port, &CommandFrame::read_reg(opcodes::RDSR1, 1), &mut buf)?;
    Ok(StatusRegister::from_bits_retain(buf[0]))
}

/// Check if a write or erase operation is in progress
pub fn check_wip<P: SpiPort + ?Sized>(port: &mut P) -> Result<bool> {
    Ok(read_status(port)?.is_write_in_progress())
}

/// Check if the Write Enable Latch is set
pub fn check_wel<P: SpiPort + ?Sized>(port: &mut P) -> Result<bool> {
    Ok(read_status(port)?.is_write_enable_latched())
}

/// Read Status Register 2
pub fn read_status2<P: SpiPort + ?Sized>(port: &mut P) -> Result<u8> {
    let mut buf = [0u8; 1];
    query(port, &CommandFrame::read_reg(opcodes::RDSR2, 1), &mut buf)?;
    Ok(buf[0])
}

/// Read the Configuration Register
pub fn read_config<P: SpiPort + ?Sized>(port: &mut P) -> Result<u8> {
    let mut buf = [0u8; 1];
    query(port, &CommandFrame::read_reg(opcodes::RDCR, 1), &mut buf)?;
    Ok(buf[0])
}

/// Clear the E_ERR and P_ERR latches in Status Register 1
pub fn clear_status<P: SpiPort + ?Sized>(port: &mut P) -> Result<()> {
    send(port, &CommandFrame::simple(opcodes::CLSR))
}

/// Write Status Register 1 and the Configuration Register
///
/// Sends write-enable, then `[WRR, status, config]`, and waits up to
/// `timeout_ms` for the non-volatile write to finish. Only the block
/// protect and SRWD bits of `status` are stored by the device.
pub fn write_registers<P, C>(
    port: &mut P,
    clock: &C,
    status: u8,
    config: u8,
    timeout_ms: u32,
) -> Result<()>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    log::debug!("spi: write registers SR1=0x{:02X} CR=0x{:02X}", status, config);
    write_enable(port)?;
    let payload = [status, config];
    send(port, &CommandFrame::write_reg(opcodes::WRR, &payload))?;
    wait_ready(port, clock, timeout_ms)
}
