//! Device identification
//!
//! Pure request/response reads. They may be issued at any time, including
//! while an erase or program is still running; the answer is then whatever
//! the device chooses to return.

use core::fmt;

use super::{query, transfer};
use crate::config::IdLayout;
use crate::error::{Error, Result};
use crate::programmer::SpiPort;
use crate::spi::{opcodes, AddressWidth, CommandFrame};

/// Manufacturer and device ID from REMS (0x90)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    /// Manufacturer ID (0x01 for Cypress/Infineon)
    pub manufacturer: u8,
    /// Device ID (0x19 for S25FL256S/512S)
    pub device: u8,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}:{:02X}", self.manufacturer, self.device)
    }
}

/// JEDEC identification from RDID (0x9F)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// JEDEC manufacturer ID
    pub manufacturer: u8,
    /// Memory interface type / device ID MSB
    pub memory_type: u8,
    /// Density / device ID LSB
    pub capacity: u8,
}

impl JedecId {
    /// Device ID as a 16-bit value
    pub fn device(&self) -> u16 {
        u16::from_be_bytes([self.memory_type, self.capacity])
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X}",
            self.manufacturer, self.memory_type, self.capacity
        )
    }
}

/// Read `out.len()` bytes of RDID identification data
///
/// The first received byte is the echo of the opcode and is dropped.
pub fn read_identification<P: SpiPort + ?Sized>(port: &mut P, out: &mut [u8]) -> Result<()> {
    query(port, &CommandFrame::read_reg(opcodes::RDID, out.len()), out)
}

/// Read the three byte JEDEC ID
pub fn read_jedec_id<P: SpiPort + ?Sized>(port: &mut P) -> Result<JedecId> {
    let mut buf = [0u8; 3];
    read_identification(port, &mut buf)?;
    let id = JedecId {
        manufacturer: buf[0],
        memory_type: buf[1],
        capacity: buf[2],
    };
    log::debug!("spi: JEDEC ID {}", id);
    Ok(id)
}

/// Read the manufacturer and device ID with REMS
///
/// Sends the opcode followed by a zero address and filler, `layout.frame_len`
/// bytes in total, and picks the two ID bytes at the layout's offsets.
pub fn read_id<P: SpiPort + ?Sized>(port: &mut P, layout: &IdLayout) -> Result<DeviceId> {
    if layout.frame_len == 0
        || layout.manufacturer_offset >= layout.frame_len
        || layout.device_offset >= layout.frame_len
    {
        return Err(Error::FrameTooShort);
    }

    let frame = if layout.frame_len > 3 {
        CommandFrame::read(opcodes::REMS, 0, AddressWidth::ThreeByte, layout.frame_len - 4)
    } else {
        CommandFrame::read_reg(opcodes::REMS, layout.frame_len - 1)
    };
    let raw = transfer(port, &frame)?;

    let id = DeviceId {
        manufacturer: raw[layout.manufacturer_offset],
        device: raw[layout.device_offset],
    };
    log::debug!("spi: REMS raw {:02X?} -> {}", raw.as_slice(), id);
    Ok(id)
}

/// Read the one byte electronic signature with RES
///
/// RES takes three dummy bytes before the signature is clocked out.
pub fn read_electronic_signature<P: SpiPort + ?Sized>(port: &mut P) -> Result<u8> {
    let mut buf = [0u8; 1];
    let frame = CommandFrame::read_reg(opcodes::RES, 1).with_dummy_bytes(3);
    query(port, &frame, &mut buf)?;
    Ok(buf[0])
}
