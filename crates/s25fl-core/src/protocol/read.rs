//! Array reads and read-back verification

use super::query;
use crate::error::{Error, Result};
use crate::programmer::SpiPort;
use crate::spi::{opcodes, AddressWidth, CommandFrame};

/// Largest number of data bytes fetched in one exchange
pub const READ_CHUNK: usize = 256;

fn chunk_limit<P: SpiPort + ?Sized>(port: &P, width: AddressWidth) -> Result<usize> {
    let header = 1 + width.bytes();
    let room = port.max_transfer_len().saturating_sub(header);
    if room == 0 {
        return Err(Error::FrameTooLong);
    }
    Ok(core::cmp::min(READ_CHUNK, room))
}

fn check_span(addr: u32, len: usize, width: AddressWidth) -> Result<()> {
    if width == AddressWidth::None {
        return Err(Error::AddressOutOfRange);
    }
    if len == 0 {
        return Ok(());
    }
    let last = addr as u64 + len as u64 - 1;
    if last > u32::MAX as u64 || !width.fits(last as u32) {
        return Err(Error::AddressOutOfRange);
    }
    Ok(())
}

/// Read `buf.len()` bytes starting at `addr`
///
/// Uses the read opcode matching `width` and splits the read so that no
/// exchange exceeds the transport's maximum length.
pub fn read_bytes<P: SpiPort + ?Sized>(
    port: &mut P,
    addr: u32,
    width: AddressWidth,
    buf: &mut [u8],
) -> Result<()> {
    check_span(addr, buf.len(), width)?;
    let max_len = chunk_limit(port, width)?;
    let opcode = opcodes::read_opcode(width);
    let mut offset = 0;

    while offset < buf.len() {
        let chunk_len = core::cmp::min(max_len, buf.len() - offset);
        let chunk = &mut buf[offset..offset + chunk_len];
        let frame = CommandFrame::read(opcode, addr + offset as u32, width, chunk_len);
        query(port, &frame, chunk)?;
        offset += chunk_len;
    }

    Ok(())
}

/// Compare flash contents at `addr` against `expected`
///
/// Returns [`Error::VerifyMismatch`] with the address of the first byte
/// that differs.
pub fn verify<P: SpiPort + ?Sized>(
    port: &mut P,
    addr: u32,
    width: AddressWidth,
    expected: &[u8],
) -> Result<()> {
    check_span(addr, expected.len(), width)?;
    let max_len = chunk_limit(port, width)?;
    let mut buf = [0u8; READ_CHUNK];
    let mut offset = 0;

    while offset < expected.len() {
        let chunk_len = core::cmp::min(max_len, expected.len() - offset);
        let chunk = &mut buf[..chunk_len];
        read_bytes(port, addr + offset as u32, width, chunk)?;

        let want = &expected[offset..offset + chunk_len];
        if let Some(i) = chunk.iter().zip(want).position(|(a, b)| a != b) {
            let address = addr + (offset + i) as u32;
            log::warn!(
                "spi: verify mismatch at 0x{:08X}: read 0x{:02X}, expected 0x{:02X}",
                address,
                chunk[i],
                want[i]
            );
            return Err(Error::VerifyMismatch { address });
        }
        offset += chunk_len;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::mock::MockPort;
    use super::*;
    use std::vec;
    use std::vec::Vec;

    #[test]
    fn test_read_frame_layout() {
        let mut port = MockPort::new();
        port.replies.push(vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xAA, 0xBB]);
        let mut buf = [0u8; 2];
        read_bytes(&mut port, 0x0100_0000, AddressWidth::FourByte, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
        assert_eq!(port.frames[0], vec![0x13, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_read_three_byte_opcode() {
        let mut port = MockPort::new();
        let mut buf = [0u8; 1];
        read_bytes(&mut port, 0x123456, AddressWidth::ThreeByte, &mut buf).unwrap();
        assert_eq!(port.frames[0], vec![0x03, 0x12, 0x34, 0x56, 0xFF]);
        assert_eq!(
            read_bytes(&mut port, 0x00FF_FFFF, AddressWidth::ThreeByte, &mut [0u8; 2]),
            Err(Error::AddressOutOfRange)
        );
    }

    #[test]
    fn test_read_needs_an_address_phase() {
        let mut port = MockPort::new();
        assert_eq!(
            read_bytes(&mut port, 0, AddressWidth::None, &mut [0u8; 4]),
            Err(Error::AddressOutOfRange)
        );
        assert_eq!(
            verify(&mut port, 0, AddressWidth::None, &[0xFF]),
            Err(Error::AddressOutOfRange)
        );
        assert!(port.frames.is_empty());
    }

    #[test]
    fn test_read_chunks_to_page() {
        let mut port = MockPort::new();
        let mut buf = vec![0u8; 600];
        read_bytes(&mut port, 0x40, AddressWidth::FourByte, &mut buf).unwrap();

        let chunks: Vec<(u32, usize)> = port
            .frames
            .iter()
            .map(|f| (AddressWidth::FourByte.decode(&f[1..]), f.len() - 5))
            .collect();
        assert_eq!(chunks, [(0x40, 256), (0x140, 256), (0x240, 88)]);
    }

    #[test]
    fn test_read_respects_transport_limit() {
        let mut port = MockPort::new();
        port.max_len = 21;
        let mut buf = [0u8; 40];
        read_bytes(&mut port, 0, AddressWidth::FourByte, &mut buf).unwrap();
        assert_eq!(port.frames.len(), 3);
        assert!(port.frames.iter().all(|f| f.len() <= 21));

        port.max_len = 5;
        assert_eq!(
            read_bytes(&mut port, 0, AddressWidth::FourByte, &mut buf),
            Err(Error::FrameTooLong)
        );
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut port = MockPort::new();
        // Unscripted reads return erased flash
        assert_eq!(verify(&mut port, 0x1000, AddressWidth::FourByte, &[0xFF; 300]), Ok(()));

        let mut reply = vec![0xFF; 5 + 4];
        reply[5 + 2] = 0x00;
        port.replies.push(reply);
        assert_eq!(
            verify(&mut port, 0x2000, AddressWidth::FourByte, &[0xFF; 4]),
            Err(Error::VerifyMismatch { address: 0x2002 })
        );
    }
}
