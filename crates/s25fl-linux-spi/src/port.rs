//! Full-duplex transport over a Linux spidev node

use crate::config::SpidevConfig;
use crate::error::{Result, SpidevError};

use s25fl_core::error::{Error as CoreError, Result as CoreResult};
use s25fl_core::programmer::SpiPort;

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

/// Module parameter holding the spidev transfer buffer size
const BUFSIZ_PARAM: &str = "/sys/module/spidev/parameters/bufsiz";

mod ioctl {
    use super::IocTransfer;

    const SPI_IOC_MAGIC: u8 = b'k';

    nix::ioctl_write_ptr!(wr_mode, SPI_IOC_MAGIC, 1, u8);
    nix::ioctl_write_ptr!(wr_bits_per_word, SPI_IOC_MAGIC, 3, u8);
    nix::ioctl_write_ptr!(wr_max_speed_hz, SPI_IOC_MAGIC, 4, u32);
    // SPI_IOC_MESSAGE(n): request size scales with the number of transfers
    nix::ioctl_write_buf!(message, SPI_IOC_MAGIC, 0, IocTransfer);
}

/// `struct spi_ioc_transfer` from `<linux/spi/spidev.h>`
#[repr(C)]
#[derive(Debug, Default)]
struct IocTransfer {
    tx_buf: u64,
    rx_buf: u64,
    len: u32,
    speed_hz: u32,
    delay_usecs: u16,
    bits_per_word: u8,
    cs_change: u8,
    tx_nbits: u8,
    rx_nbits: u8,
    word_delay_usecs: u8,
    pad: u8,
}

/// An opened spidev node
///
/// Each [`SpiPort::exchange`] is one `SPI_IOC_MESSAGE(1)`, so chip select
/// frames exactly one command.
#[derive(Debug)]
pub struct SpidevPort {
    file: File,
    clock_hz: u32,
    buf_limit: usize,
}

impl SpidevPort {
    /// Open the node and apply mode, word size and clock
    pub fn open(config: &SpidevConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.path)
            .map_err(|source| SpidevError::Open {
                path: config.path.clone(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let mode = config.mode.bits();
        configure("mode", mode.into(), || unsafe { ioctl::wr_mode(fd, &mode) })?;
        let bits: u8 = 8;
        configure("bits per word", bits.into(), || unsafe {
            ioctl::wr_bits_per_word(fd, &bits)
        })?;
        let mut port = Self {
            file,
            clock_hz: config.clock_hz,
            buf_limit: spidev_buf_limit(),
        };
        port.set_clock_hz(config.clock_hz)?;

        log::info!(
            "linux_spi: {} open, mode {}, {} kHz, {} byte buffer",
            config.path.display(),
            mode,
            config.clock_hz / 1000,
            port.buf_limit
        );
        Ok(port)
    }

    /// Current SCK frequency in Hz
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Change the SCK frequency
    pub fn set_clock_hz(&mut self, clock_hz: u32) -> Result<()> {
        let fd = self.fd();
        configure("clock", clock_hz, || unsafe {
            ioctl::wr_max_speed_hz(fd, &clock_hz)
        })?;
        self.clock_hz = clock_hz;
        Ok(())
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Clock `tx` out while capturing the same number of bytes into `rx`
    fn transfer(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
        check_frame(tx.len(), rx.as_deref().map(<[u8]>::len), self.buf_limit)?;

        let transfer = IocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.map_or(0, |buf| buf.as_mut_ptr() as u64),
            len: tx.len() as u32,
            speed_hz: self.clock_hz,
            bits_per_word: 8,
            ..Default::default()
        };

        // SAFETY: both buffers outlive the ioctl and are `len` bytes long
        unsafe { ioctl::message(self.fd(), std::slice::from_ref(&transfer)) }
            .map_err(|errno| SpidevError::Transfer(io::Error::from(errno)))?;
        Ok(())
    }
}

impl SpiPort for SpidevPort {
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> CoreResult<()> {
        self.transfer(tx, rx).map_err(|e| {
            log::error!("linux_spi: {}", e);
            CoreError::TransportFailure
        })
    }

    fn max_transfer_len(&self) -> usize {
        self.buf_limit
    }
}

fn configure<F>(setting: &'static str, value: u32, set: F) -> Result<()>
where
    F: FnOnce() -> nix::Result<i32>,
{
    set().map(drop).map_err(|errno| SpidevError::Configure {
        setting,
        value,
        source: io::Error::from(errno),
    })
}

fn check_frame(tx: usize, rx: Option<usize>, limit: usize) -> Result<()> {
    if tx == 0 {
        return Err(SpidevError::EmptyFrame);
    }
    if tx > limit {
        return Err(SpidevError::FrameTooLarge { len: tx, limit });
    }
    match rx {
        Some(rx) if rx != tx => Err(SpidevError::LengthMismatch { tx, rx }),
        _ => Ok(()),
    }
}

/// spidev buffer size from sysfs, else the system page size
fn spidev_buf_limit() -> usize {
    match std::fs::read_to_string(BUFSIZ_PARAM)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
    {
        Some(size) if size > 0 => size,
        _ => {
            let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            log::debug!("linux_spi: {} unreadable, using page size {}", BUFSIZ_PARAM, page);
            usize::try_from(page).unwrap_or(4096)
        }
    }
}
