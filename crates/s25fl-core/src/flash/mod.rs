//! High-level flash handle
//!
//! [`Flash`] owns the transport, the tick source and the device
//! configuration, and exposes the protocol operations as methods. Ownership
//! of the handle is ownership of the bus.

use crate::config::FlashConfig;
use crate::error::{Error, PartialWrite, Result};
use crate::programmer::{SpiPort, TickSource};
use crate::protocol::{self, DeviceId, JedecId, StatusRegister};

/// A single S25FL device behind a transport
///
/// # Example
///
/// ```ignore
/// let mut flash = Flash::new(port, StdClock::new(), FlashConfig::default());
/// flash.init()?;
///
/// let mut buf = [0u8; 4096];
/// flash.read(0, &mut buf)?;
/// ```
pub struct Flash<P: SpiPort, C: TickSource> {
    port: P,
    clock: C,
    config: FlashConfig,
}

impl<P: SpiPort, C: TickSource> Flash<P, C> {
    /// Wrap a transport and tick source
    pub fn new(port: P, clock: C, config: FlashConfig) -> Self {
        Self {
            port,
            clock,
            config,
        }
    }

    /// Bring the device to a known state
    ///
    /// Issues a software reset and logs the manufacturer/device and JEDEC
    /// IDs. Returns the REMS ID.
    pub fn init(&mut self) -> Result<DeviceId> {
        protocol::software_reset(&mut self.port)?;
        let id = self.read_id()?;
        let jedec = self.read_jedec_id()?;
        log::info!("flash: manufacturer/device {}, JEDEC {}", id, jedec);
        Ok(id)
    }

    /// The device configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Mutable access to the transport
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the handle and return the transport and tick source
    pub fn into_inner(self) -> (P, C) {
        (self.port, self.clock)
    }

    /// Read Status Register 1
    pub fn read_status(&mut self) -> Result<StatusRegister> {
        protocol::read_status(&mut self.port)
    }

    /// Wait for the current erase or program to finish
    pub fn wait_ready(&mut self, timeout_ms: u32) -> Result<()> {
        protocol::wait_ready(&mut self.port, &self.clock, timeout_ms)
    }

    /// Send Write Enable
    pub fn write_enable(&mut self) -> Result<()> {
        protocol::write_enable(&mut self.port)
    }

    /// Send Write Disable
    pub fn write_disable(&mut self) -> Result<()> {
        protocol::write_disable(&mut self.port)
    }

    /// Read the manufacturer and device ID with REMS
    pub fn read_id(&mut self) -> Result<DeviceId> {
        protocol::read_id(&mut self.port, &self.config.id_layout)
    }

    /// Read the JEDEC ID
    pub fn read_jedec_id(&mut self) -> Result<JedecId> {
        protocol::read_jedec_id(&mut self.port)
    }

    /// Read the electronic signature with RES
    pub fn read_electronic_signature(&mut self) -> Result<u8> {
        protocol::read_electronic_signature(&mut self.port)
    }

    /// Read Status Register 2
    pub fn read_status2(&mut self) -> Result<u8> {
        protocol::read_status2(&mut self.port)
    }

    /// Read the Configuration Register
    pub fn read_config(&mut self) -> Result<u8> {
        protocol::read_config(&mut self.port)
    }

    /// Write Status Register 1 and the Configuration Register
    pub fn write_registers(&mut self, status: u8, config: u8) -> Result<()> {
        let timeout = self.config.timeouts.register_ms;
        protocol::write_registers(&mut self.port, &self.clock, status, config, timeout)
    }

    /// Clear the program and erase error latches
    pub fn clear_status(&mut self) -> Result<()> {
        protocol::clear_status(&mut self.port)
    }

    /// Read `buf.len()` bytes from `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        if !self.config.geometry.contains(addr, buf.len()) {
            return Err(Error::AddressOutOfRange);
        }
        protocol::read_bytes(&mut self.port, addr, self.config.address_width, buf)
    }

    /// Erase the sector containing `addr` and wait for it to finish
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        protocol::erase_sector_blocking(&mut self.port, &self.clock, &self.config, addr)
    }

    /// Erase a sector-aligned range
    pub fn erase_range(
        &mut self,
        addr: u32,
        len: usize,
    ) -> core::result::Result<usize, PartialWrite> {
        protocol::erase_range(&mut self.port, &self.clock, &self.config, addr, len)
    }

    /// Erase the whole device
    pub fn bulk_erase(&mut self) -> Result<()> {
        let timeout = self.config.timeouts.bulk_erase_ms;
        protocol::bulk_erase(&mut self.port, &self.clock, timeout)
    }

    /// Program `data` at `addr`, split at page boundaries
    ///
    /// The target must already be erased.
    pub fn program(
        &mut self,
        addr: u32,
        data: &[u8],
    ) -> core::result::Result<usize, PartialWrite> {
        protocol::program_buffer(&mut self.port, &self.clock, &self.config, addr, data)
    }

    /// Compare flash contents at `addr` against `expected`
    pub fn verify(&mut self, addr: u32, expected: &[u8]) -> Result<()> {
        if !self.config.geometry.contains(addr, expected.len()) {
            return Err(Error::AddressOutOfRange);
        }
        protocol::verify(&mut self.port, addr, self.config.address_width, expected)
    }

    /// Software reset
    pub fn reset(&mut self) -> Result<()> {
        protocol::software_reset(&mut self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::{MockPort, StepClock};
    use crate::spi::{opcodes, AddressWidth};
    use std::vec;

    fn flash(config: FlashConfig) -> Flash<MockPort, StepClock> {
        Flash::new(MockPort::new(), StepClock::new(1, 1000), config)
    }

    #[test]
    fn test_init_resets_then_identifies() {
        let mut flash = flash(FlashConfig::default());
        flash
            .port_mut()
            .replies
            .push(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x19]);
        flash.port_mut().replies.push(vec![0xFF, 0x01, 0x02, 0x20]);

        let id = flash.init().unwrap();
        assert_eq!(id.manufacturer, 0x01);
        assert_eq!(id.device, 0x19);

        let (port, _) = flash.into_inner();
        let ops: std::vec::Vec<u8> = port.frames.iter().map(|f| f[0]).collect();
        assert_eq!(ops, [opcodes::RESET, opcodes::REMS, opcodes::RDID]);
    }

    #[test]
    fn test_address_width_selects_opcodes() {
        let config = FlashConfig::default().with_address_width(AddressWidth::ThreeByte);
        let mut flash = flash(config);
        flash.erase_sector(0x0004_0000).unwrap();
        flash.program(0x0004_0000, &[1, 2]).unwrap();
        flash.read(0x0004_0000, &mut [0u8; 2]).unwrap();

        let (port, _) = flash.into_inner();
        assert_eq!(port.frames_with(&[opcodes::SE]).len(), 1);
        assert_eq!(port.frames_with(&[opcodes::PP]).len(), 1);
        assert_eq!(port.frames_with(&[opcodes::READ]).len(), 1);
        assert!(port.frames_with(&[opcodes::SE_4B, opcodes::PP_4B]).is_empty());
    }

    #[test]
    fn test_unaddressed_width_is_rejected() {
        let config = FlashConfig::default().with_address_width(AddressWidth::None);
        let mut flash = flash(config);
        assert_eq!(flash.read(0, &mut [0u8; 2]), Err(Error::AddressOutOfRange));
        assert_eq!(flash.verify(0, &[0xFF]), Err(Error::AddressOutOfRange));
        assert_eq!(
            flash.program(0, &[1, 2]),
            Err(PartialWrite::new(0, Error::AddressOutOfRange))
        );
        assert_eq!(flash.erase_sector(0), Err(Error::AddressOutOfRange));
        assert_eq!(
            flash.erase_range(0, 0x0004_0000),
            Err(PartialWrite::new(0, Error::AddressOutOfRange))
        );

        // Nothing reaches the bus, not even a write enable
        let (port, _) = flash.into_inner();
        assert!(port.frames.is_empty());
    }

    #[test]
    fn test_read_checks_device_bounds() {
        let mut flash = flash(FlashConfig::default());
        let end = flash.config().geometry.total_size;
        assert_eq!(
            flash.read(end - 1, &mut [0u8; 2]),
            Err(Error::AddressOutOfRange)
        );
        assert_eq!(flash.verify(end, &[0]), Err(Error::AddressOutOfRange));
        assert_eq!(flash.erase_sector(end), Err(Error::AddressOutOfRange));
    }

    #[test]
    fn test_bulk_erase_uses_configured_budget() {
        let mut config = FlashConfig::default();
        config.timeouts.bulk_erase_ms = 2;
        let mut flash = flash(config);
        flash.port_mut().busy_polls = u32::MAX;

        assert_eq!(flash.bulk_erase(), Err(Error::Timeout));
        assert!(flash.read_status().unwrap().is_write_in_progress());
    }
}
