//! Transport and time source traits
//!
//! The protocol layer never touches hardware directly. A transport backend
//! (spidev, an MCU SPI peripheral, the in-memory emulator) implements
//! [`SpiPort`]; a monotonic counter implements [`TickSource`].

use crate::error::Result;
use crate::spi::MAX_FRAME_LEN;

/// Synchronous full-duplex byte transport
///
/// One call to [`exchange`](SpiPort::exchange) is one chip-select session:
/// CS is asserted, `tx.len()` bytes are clocked out while the same number of
/// bytes is clocked in, then CS is released.
///
/// Interrupt or DMA driven peripherals must hide their completion mechanism
/// behind this blocking call. Backend specific errors are reported as
/// [`Error::TransportFailure`](crate::Error::TransportFailure).
///
/// ## Example
///
/// ```ignore
/// impl SpiPort for MySpi {
///     fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
///         self.cs_low();
///         let ret = self.transfer(tx, rx);
///         self.cs_high();
///         ret.map_err(|_| Error::TransportFailure)
///     }
/// }
/// ```
pub trait SpiPort {
    /// Exchange `tx` with the device
    ///
    /// When `rx` is `Some`, it has the same length as `tx` and receives every
    /// byte clocked in, echo bytes included. When `None`, received bytes are
    /// discarded.
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()>;

    /// Transport level busy flag
    ///
    /// Polled after every exchange until the transfer has fully drained.
    /// Blocking transports can keep the default.
    fn is_busy(&self) -> bool {
        false
    }

    /// Get the maximum number of bytes that can be exchanged in one session
    fn max_transfer_len(&self) -> usize {
        MAX_FRAME_LEN
    }
}

/// Monotonic tick counter used to bound ready-waits
pub trait TickSource {
    /// Current tick count
    fn now_ticks(&self) -> u64;

    /// Number of ticks per millisecond
    fn ticks_per_ms(&self) -> u64;
}

impl<P: SpiPort + ?Sized> SpiPort for &mut P {
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
        (**self).exchange(tx, rx)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}

impl<C: TickSource + ?Sized> TickSource for &C {
    fn now_ticks(&self) -> u64 {
        (**self).now_ticks()
    }

    fn ticks_per_ms(&self) -> u64 {
        (**self).ticks_per_ms()
    }
}

// Boxed ports let the CLI pick a backend at runtime
#[cfg(feature = "std")]
impl<P: SpiPort + ?Sized> SpiPort for std::boxed::Box<P> {
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
        (**self).exchange(tx, rx)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }
}

/// Tick source backed by `std::time::Instant`, one tick per microsecond
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock whose tick zero is now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TickSource for StdClock {
    fn now_ticks(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }

    fn ticks_per_ms(&self) -> u64 {
        1_000
    }
}
