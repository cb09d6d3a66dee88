//! Command frame encoding and response decoding
//!
//! Every command is a single full-duplex exchange. The device clocks one
//! meaningless byte back for every byte of opcode, address and dummy phase,
//! so recovering a response is purely positional: skip `header_len` echo
//! bytes and take the requested number of bytes after them.

use heapless::Vec;

use super::AddressWidth;
use crate::error::{Error, Result};

/// Largest frame the transport exchanges: opcode + 4-byte address + one page
pub const MAX_FRAME_LEN: usize = 1 + 4 + 256;

/// Value clocked out during dummy and response phases
pub const FILLER: u8 = 0xFF;

/// Fixed-capacity buffer holding one encoded frame
pub type FrameBuf = Vec<u8, MAX_FRAME_LEN>;

/// A single flash command
///
/// Designed to avoid allocation - the payload is borrowed. A frame either
/// carries a payload (program, register write) or asks for `response_len`
/// bytes back (reads); the response bytes are clocked out as [`FILLER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of filler bytes between address and data
    pub dummy_bytes: u8,

    /// Data to send after opcode/address/dummy
    pub payload: &'a [u8],

    /// Number of bytes to read back after opcode/address/dummy
    pub response_len: usize,
}

impl<'a> CommandFrame<'a> {
    /// Create a simple command with no address or data (e.g., WREN, WRDI)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_bytes: 0,
            payload: &[],
            response_len: 0,
        }
    }

    /// Create a register read with no address (e.g., RDSR1, RDID)
    pub fn read_reg(opcode: u8, response_len: usize) -> Self {
        Self {
            response_len,
            ..Self::simple(opcode)
        }
    }

    /// Create a register write with no address (e.g., WRR)
    pub fn write_reg(opcode: u8, payload: &'a [u8]) -> Self {
        Self {
            payload,
            ..Self::simple(opcode)
        }
    }

    /// Create an addressed read command
    pub fn read(opcode: u8, addr: u32, width: AddressWidth, response_len: usize) -> Self {
        Self {
            address: Some(addr),
            address_width: width,
            response_len,
            ..Self::simple(opcode)
        }
    }

    /// Create an addressed write command (e.g., PP, PP_4B)
    pub fn write(opcode: u8, addr: u32, width: AddressWidth, payload: &'a [u8]) -> Self {
        Self {
            address: Some(addr),
            address_width: width,
            payload,
            ..Self::simple(opcode)
        }
    }

    /// Create an erase command (address only)
    pub fn erase(opcode: u8, addr: u32, width: AddressWidth) -> Self {
        Self {
            address: Some(addr),
            address_width: width,
            ..Self::simple(opcode)
        }
    }

    /// Set the number of dummy bytes
    pub fn with_dummy_bytes(mut self, count: u8) -> Self {
        self.dummy_bytes = count;
        self
    }

    /// Bytes before the payload or response: opcode, address and dummy
    pub fn header_len(&self) -> usize {
        1 + self.address_width.bytes() + self.dummy_bytes as usize
    }

    /// Total number of bytes exchanged for this command
    pub fn total_len(&self) -> usize {
        self.header_len() + self.payload.len() + self.response_len
    }

    /// Returns true if this command reads data back
    pub fn has_response(&self) -> bool {
        self.response_len > 0
    }

    /// Encode the frame into a fixed-capacity buffer
    pub fn encode(&self) -> Result<FrameBuf> {
        if self.total_len() > MAX_FRAME_LEN {
            return Err(Error::FrameTooLong);
        }

        let mut buf = encode_addressed(
            self.opcode,
            self.address.unwrap_or(0),
            self.address_width,
            self.dummy_bytes,
            self.payload,
        )?;
        let len = buf.len() + self.response_len;
        buf.resize(len, FILLER).map_err(|_| Error::FrameTooLong)?;
        Ok(buf)
    }

    /// Extract this command's response from the raw receive buffer
    pub fn response<'r>(&self, raw: &'r [u8]) -> Result<&'r [u8]> {
        decode(raw, self.header_len(), self.response_len)
    }
}

/// Encode opcode, big-endian address, dummy filler and payload
///
/// Emits `address_width.bytes()` bytes of `address` most significant first;
/// higher bits are dropped. Fails with [`Error::FrameTooLong`] when the frame
/// would not fit in [`MAX_FRAME_LEN`].
pub fn encode_addressed(
    opcode: u8,
    address: u32,
    address_width: AddressWidth,
    dummy_bytes: u8,
    payload: &[u8],
) -> Result<FrameBuf> {
    let header_len = 1 + address_width.bytes() + dummy_bytes as usize;
    if header_len + payload.len() > MAX_FRAME_LEN {
        return Err(Error::FrameTooLong);
    }

    let mut buf = FrameBuf::new();
    let mut addr = [0u8; 4];
    address_width.encode(address, &mut addr);

    buf.push(opcode).map_err(|_| Error::FrameTooLong)?;
    buf.extend_from_slice(&addr[..address_width.bytes()])
        .map_err(|_| Error::FrameTooLong)?;
    buf.resize(header_len, FILLER)
        .map_err(|_| Error::FrameTooLong)?;
    buf.extend_from_slice(payload)
        .map_err(|_| Error::FrameTooLong)?;
    Ok(buf)
}

/// Return `raw[header_len .. header_len + wanted_len]`
///
/// Fails with [`Error::FrameTooShort`] when fewer bytes were exchanged.
pub fn decode(raw: &[u8], header_len: usize, wanted_len: usize) -> Result<&[u8]> {
    let end = header_len
        .checked_add(wanted_len)
        .ok_or(Error::FrameTooShort)?;
    raw.get(header_len..end).ok_or(Error::FrameTooShort)
}
