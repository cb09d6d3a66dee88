//! s25fl-core - Command protocol layer for S25FL serial NOR flash
//!
//! This crate encodes command frames, decodes full-duplex responses and
//! sequences the write-enable / erase-or-program / poll-for-ready protocol
//! that the flash requires. It is `no_std` and never allocates: every frame
//! is built in a fixed 261-byte stack buffer.
//!
//! The transport and the time source are supplied by the caller through the
//! [`programmer::SpiPort`] and [`programmer::TickSource`] traits.
//!
//! # Features
//!
//! - `std` - Enable `std::error::Error` and the `Instant` based [`programmer::StdClock`]
//!
//! # Example
//!
//! ```ignore
//! use s25fl_core::{flash::Flash, FlashConfig};
//!
//! fn store<P: SpiPort, C: TickSource>(port: P, clock: C) -> s25fl_core::Result<()> {
//!     let mut flash = Flash::new(port, clock, FlashConfig::default());
//!     flash.init()?;
//!     flash.erase_sector(0x0001_0000)?;
//!     flash.program(0x0001_0000, b"Hello Flash!")?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod config;
pub mod error;
pub mod flash;
pub mod programmer;
pub mod protocol;
pub mod spi;

pub use config::{FlashConfig, Geometry, IdLayout, Timeouts};
pub use error::{Error, PartialWrite, Result};
