//! Errors raised by the spidev transport

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while opening or driving a spidev node
#[derive(Debug, Error)]
pub enum SpidevError {
    /// The character device could not be opened
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A controller setting was rejected by the driver
    #[error("cannot set {setting} to {value}: {source}")]
    Configure {
        setting: &'static str,
        value: u32,
        #[source]
        source: io::Error,
    },

    /// The SPI_IOC_MESSAGE ioctl failed
    #[error("transfer failed: {0}")]
    Transfer(#[source] io::Error),

    /// Zero-length frames are never clocked
    #[error("empty frame")]
    EmptyFrame,

    /// Frame longer than the spidev buffer
    #[error("frame of {len} bytes exceeds the {limit} byte spidev buffer")]
    FrameTooLarge { len: usize, limit: usize },

    /// Receive buffer length differs from the transmit frame
    #[error("receive buffer is {rx} bytes for a {tx} byte frame")]
    LengthMismatch { tx: usize, rx: usize },

    /// Programmer option string could not be used
    #[error("{0}")]
    Option(String),
}

/// Result alias for spidev operations
pub type Result<T> = std::result::Result<T, SpidevError>;
