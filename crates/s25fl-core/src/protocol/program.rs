//! Page program and multi-page writes

use super::{send, wait_ready, write_enable};
use crate::config::FlashConfig;
use crate::error::{Error, PartialWrite, Result};
use crate::programmer::{SpiPort, TickSource};
use crate::spi::{opcodes, AddressWidth, CommandFrame};

/// Program a single page (up to `page_size` bytes)
///
/// The caller must have sent [`write_enable`] immediately before, and must
/// wait for the device afterwards. The data must be non-empty and must not
/// cross a page boundary; the device would silently wrap inside the page, so
/// this is checked and reported as [`Error::PageBoundaryViolation`].
pub fn program_page<P: SpiPort + ?Sized>(
    port: &mut P,
    addr: u32,
    data: &[u8],
    width: AddressWidth,
    page_size: usize,
) -> Result<()> {
    if data.is_empty() || page_size == 0 || data.len() > page_size {
        return Err(Error::PageBoundaryViolation);
    }
    let last = addr as u64 + data.len() as u64 - 1;
    if last > u32::MAX as u64 || !width.fits(last as u32) {
        return Err(Error::AddressOutOfRange);
    }
    if addr as u64 / page_size as u64 != last / page_size as u64 {
        return Err(Error::PageBoundaryViolation);
    }

    log::debug!("spi: program {} bytes at 0x{:08X}", data.len(), addr);
    let frame = CommandFrame::write(opcodes::program_opcode(width), addr, width, data);
    send(port, &frame)
}

/// One page-bounded slice of a larger write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChunk {
    /// Flash address of the first byte
    pub address: u32,
    /// Offset of the first byte within the source buffer
    pub offset: usize,
    /// Number of bytes
    pub len: usize,
}

/// Split `[start, start + len)` into chunks that never cross a page boundary
///
/// An unaligned start gets a short first chunk up to the next boundary;
/// after that every chunk is `min(page_size, remaining)`. Chunks come out in
/// increasing address order with no gaps or overlaps.
#[derive(Debug, Clone)]
pub struct PageChunks {
    address: u64,
    offset: usize,
    len: usize,
    page_size: usize,
}

impl PageChunks {
    /// Chunk `len` bytes starting at flash address `start`
    ///
    /// # Panics
    /// If `page_size` is zero.
    pub fn new(start: u32, len: usize, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be non-zero");
        Self {
            address: start as u64,
            offset: 0,
            len,
            page_size,
        }
    }
}

impl Iterator for PageChunks {
    type Item = PageChunk;

    fn next(&mut self) -> Option<PageChunk> {
        let remaining = self.len - self.offset;
        if remaining == 0 {
            return None;
        }

        let to_boundary = self.page_size - (self.address % self.page_size as u64) as usize;
        let chunk_len = core::cmp::min(to_boundary, remaining);
        let chunk = PageChunk {
            address: self.address as u32,
            offset: self.offset,
            len: chunk_len,
        };

        self.address += chunk_len as u64;
        self.offset += chunk_len;
        Some(chunk)
    }
}

/// Write-enable, program and wait for one page-bounded chunk
fn program_chunk<P, C>(
    port: &mut P,
    clock: &C,
    config: &FlashConfig,
    addr: u32,
    data: &[u8],
) -> Result<()>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    write_enable(port)?;
    program_page(port, addr, data, config.address_width, config.geometry.page_size)?;
    wait_ready(port, clock, config.timeouts.program_ms)
}

/// Write a buffer of any length, one page program at a time
///
/// Each chunk gets its own write-enable, page program and ready-wait; the
/// device cannot overlap program cycles, so the next chunk only starts once
/// the previous one has finished.
///
/// Returns the number of bytes written. On failure the returned
/// [`PartialWrite`] reports how many bytes were committed before the failing
/// chunk; nothing is retried.
pub fn program_buffer<P, C>(
    port: &mut P,
    clock: &C,
    config: &FlashConfig,
    start: u32,
    data: &[u8],
) -> core::result::Result<usize, PartialWrite>
where
    P: SpiPort + ?Sized,
    C: TickSource + ?Sized,
{
    let geometry = &config.geometry;
    if geometry.page_size == 0 {
        return Err(PartialWrite::new(0, Error::PageBoundaryViolation));
    }
    if !geometry.contains(start, data.len()) || config.address_width == AddressWidth::None {
        return Err(PartialWrite::new(0, Error::AddressOutOfRange));
    }

    for chunk in PageChunks::new(start, data.len(), geometry.page_size) {
        let bytes = &data[chunk.offset..chunk.offset + chunk.len];
        let result = program_chunk(port, clock, config, chunk.address, bytes);

        if let Err(e) = result {
            log::error!(
                "spi: program failed at 0x{:08X} after {} bytes: {}",
                chunk.address,
                chunk.offset,
                e
            );
            return Err(PartialWrite::new(chunk.offset, e));
        }
    }

    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::super::mock::{MockPort, StepClock};
    use super::*;
    use crate::config::Geometry;
    use std::vec::Vec;

    const PAGE: usize = 256;

    fn program_frames(port: &MockPort) -> Vec<(u32, usize)> {
        port.frames_with(&[opcodes::PP, opcodes::PP_4B])
            .into_iter()
            .map(|f| (AddressWidth::FourByte.decode(&f[1..]), f.len() - 5))
            .collect()
    }

    #[test]
    fn test_page_program_frame() {
        let mut port = MockPort::new();
        program_page(&mut port, 0x0001_0000, &[1, 2, 3], AddressWidth::FourByte, PAGE).unwrap();
        assert_eq!(port.frames[0], [0x12, 0x00, 0x01, 0x00, 0x00, 1, 2, 3]);

        program_page(&mut port, 0x0001_0000, &[9], AddressWidth::ThreeByte, PAGE).unwrap();
        assert_eq!(port.frames[1], [0x02, 0x01, 0x00, 0x00, 9]);
    }

    #[test]
    fn test_page_program_rejects_boundary_crossing() {
        let mut port = MockPort::new();
        let data = [0u8; 16];
        assert_eq!(
            program_page(&mut port, 0x0F8, &data, AddressWidth::FourByte, PAGE),
            Err(Error::PageBoundaryViolation)
        );
        assert_eq!(
            program_page(&mut port, 0, &[0u8; PAGE + 1], AddressWidth::FourByte, PAGE),
            Err(Error::PageBoundaryViolation)
        );
        assert_eq!(
            program_page(&mut port, 0, &[], AddressWidth::FourByte, PAGE),
            Err(Error::PageBoundaryViolation)
        );
        assert_eq!(
            program_page(&mut port, 0x00FF_FFFF, &[0, 0], AddressWidth::ThreeByte, PAGE),
            Err(Error::AddressOutOfRange)
        );
        assert_eq!(
            program_page(&mut port, 0, &[1], AddressWidth::None, PAGE),
            Err(Error::AddressOutOfRange)
        );
        assert!(port.frames.is_empty());
    }

    #[test]
    fn test_chunks_aligned() {
        let chunks: Vec<_> = PageChunks::new(0x1000, 3 * PAGE + 10, PAGE).collect();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3], PageChunk { address: 0x1300, offset: 768, len: 10 });
    }

    #[test]
    fn test_chunks_unaligned_start() {
        let chunks: Vec<_> = PageChunks::new(0x10F0, PAGE, PAGE).collect();
        assert_eq!(
            chunks,
            [
                PageChunk { address: 0x10F0, offset: 0, len: 16 },
                PageChunk { address: 0x1100, offset: 16, len: 240 },
            ]
        );
    }

    #[test]
    fn test_chunks_cover_without_gaps() {
        for start in [0u32, 1, 0xFF, 0x100, 0x1234] {
            for len in [1usize, 255, 256, 257, 1000] {
                let mut next = start;
                let mut total = 0;
                for chunk in PageChunks::new(start, len, PAGE) {
                    assert_eq!(chunk.address, next);
                    assert!(chunk.len > 0 && chunk.len <= PAGE);
                    let last = chunk.address + chunk.len as u32 - 1;
                    assert_eq!(chunk.address / PAGE as u32, last / PAGE as u32);
                    next += chunk.len as u32;
                    total += chunk.len;
                }
                assert_eq!(total, len);
            }
        }
    }

    #[test]
    fn test_program_buffer_issues_k_plus_one_programs() {
        let mut port = MockPort::new();
        let clock = StepClock::new(1, 1000);
        let config = FlashConfig::default();
        let data: Vec<u8> = (0..(4 * PAGE + 17)).map(|i| i as u8).collect();

        let written = program_buffer(&mut port, &clock, &config, 0x0002_0000, &data).unwrap();
        assert_eq!(written, data.len());

        let programs = program_frames(&port);
        assert_eq!(programs.len(), 5);
        let mut expected = 0x0002_0000;
        for (i, (addr, len)) in programs.iter().enumerate() {
            assert_eq!(*addr, expected);
            assert_eq!(*len, if i < 4 { PAGE } else { 17 });
            expected += *len as u32;
        }

        // Every program is preceded by its own write enable
        let ops: Vec<u8> = port.frames.iter().map(|f| f[0]).collect();
        for (i, op) in ops.iter().enumerate() {
            if *op == opcodes::PP_4B {
                assert_eq!(ops[i - 1], opcodes::WREN);
            }
        }
    }

    #[test]
    fn test_program_buffer_payload_bytes() {
        let mut port = MockPort::new();
        let clock = StepClock::new(1, 1000);
        let data: Vec<u8> = (0..300).map(|i| (i * 7) as u8).collect();
        program_buffer(&mut port, &clock, &FlashConfig::default(), 0, &data).unwrap();

        let pp = port.frames_with(&[opcodes::PP_4B]);
        assert_eq!(&pp[0][5..], &data[..256]);
        assert_eq!(&pp[1][5..], &data[256..]);
    }

    #[test]
    fn test_program_buffer_stall_reports_progress() {
        let mut port = MockPort::new();
        port.stall_program = Some(3);
        let clock = StepClock::new(1, 10);
        let data = [0x5Au8; 5 * PAGE];

        let err = program_buffer(&mut port, &clock, &FlashConfig::default(), 0, &data).unwrap_err();
        assert_eq!(err.committed, 2 * PAGE);
        assert_eq!(err.error, Error::Timeout);
        assert_eq!(Error::from(err), Error::Timeout);
        assert_eq!(program_frames(&port).len(), 3);
    }

    #[test]
    fn test_program_buffer_transport_failure_mid_write() {
        let mut port = MockPort::new();
        port.busy_polls = 0;
        // WREN, PP, RDSR for the first chunk, then WREN of the second fails
        port.fail_exchange = Some(3);
        let clock = StepClock::new(1, 10);
        let data = [0u8; 2 * PAGE];

        let err = program_buffer(&mut port, &clock, &FlashConfig::default(), 0, &data).unwrap_err();
        assert_eq!(err, PartialWrite::new(PAGE, Error::TransportFailure));
    }

    #[test]
    fn test_program_buffer_out_of_range() {
        let mut port = MockPort::new();
        let clock = StepClock::new(1, 10);
        let config = FlashConfig::default();
        let end = config.geometry.total_size;
        let err = program_buffer(&mut port, &clock, &config, end - 1, &[0, 0]).unwrap_err();
        assert_eq!(err, PartialWrite::new(0, Error::AddressOutOfRange));
        assert!(port.frames.is_empty());
        assert_eq!(program_buffer(&mut port, &clock, &config, 0, &[]), Ok(0));
    }

    #[test]
    fn test_program_buffer_zero_page_size() {
        let mut port = MockPort::new();
        let clock = StepClock::new(1, 10);
        let config = FlashConfig::default().with_geometry(Geometry {
            page_size: 0,
            ..Geometry::default()
        });
        assert_eq!(
            program_buffer(&mut port, &clock, &config, 0, &[1, 2, 3]),
            Err(PartialWrite::new(0, Error::PageBoundaryViolation))
        );
        assert!(port.frames.is_empty());
    }
}
