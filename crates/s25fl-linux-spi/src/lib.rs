//! s25fl-linux-spi - spidev transport for S25FL flash
//!
//! Drives a flash wired to a Linux SPI controller through its
//! `/dev/spidevX.Y` character device. The kernel needs `CONFIG_SPI_SPIDEV`
//! and the caller needs read/write access to the node.
//!
//! ```no_run
//! use s25fl_core::protocol;
//! use s25fl_linux_spi::{SpiMode, SpidevConfig, SpidevPort};
//!
//! let config = SpidevConfig::new("/dev/spidev0.0")
//!     .with_clock_hz(4_000_000)
//!     .with_mode(SpiMode::Mode0);
//! let mut port = SpidevPort::open(&config)?;
//! let id = protocol::read_jedec_id(&mut port)?;
//! println!("JEDEC ID: {}", id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! From the CLI the same settings are given as programmer options:
//!
//! ```bash
//! s25fl -p linux_spi:dev=/dev/spidev0.0,spispeed=4000,mode=0 id
//! ```

pub mod config;
pub mod error;
pub mod port;

pub use config::{SpiMode, SpidevConfig, DEFAULT_CLOCK_HZ};
pub use error::{Result, SpidevError};
pub use port::SpidevPort;

/// Open a spidev node from `key=value` programmer options
pub fn open_from_options(options: &[(&str, &str)]) -> Result<SpidevPort> {
    let config = SpidevConfig::from_options(options)?;
    SpidevPort::open(&config)
}
