//! s25fl-dummy - In-memory S25FL flash emulator for testing
//!
//! This crate provides a [`SpiPort`] that emulates an S25FL512S in memory,
//! byte for byte at the frame level: every exchange is decoded from the raw
//! transmit buffer and answered the way the device would answer on the wire,
//! echo bytes included. It's useful for testing and development without real
//! hardware.
//!
//! The emulator enforces the write-enable latch, keeps WIP set for a
//! configurable number of status reads after each erase or program, and
//! ignores mutating commands while busy.

use s25fl_core::config::Geometry;
use s25fl_core::error::{Error, Result};
use s25fl_core::programmer::SpiPort;
use s25fl_core::spi::{opcodes, AddressWidth, FILLER};

/// Configuration for the dummy flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Manufacturer ID returned by REMS
    pub manufacturer_id: u8,
    /// Device ID returned by REMS
    pub device_id: u8,
    /// Three byte JEDEC ID returned by RDID
    pub jedec_id: [u8; 3],
    /// Electronic signature returned by RES
    pub signature: u8,
    /// Flash size in bytes
    pub size: usize,
    /// Page size for programming
    pub page_size: usize,
    /// Sector size for erase
    pub sector_size: usize,
    /// Status reads that report WIP after each erase or program
    pub busy_polls: u32,
    /// Page program (1-based) after which WIP never clears
    pub stall_program: Option<usize>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0x01, // Cypress/Infineon
            device_id: 0x19,
            jedec_id: [0x01, 0x02, 0x20], // S25FL512S
            signature: 0x19,
            size: 64 * 1024 * 1024,
            page_size: 256,
            sector_size: 0x0004_0000,
            busy_polls: 2,
            stall_program: None,
        }
    }
}

impl DummyConfig {
    /// Array geometry matching this emulator
    pub fn geometry(&self) -> Geometry {
        Geometry {
            page_size: self.page_size,
            sector_size: self.sector_size as u32,
            total_size: self.size as u32,
        }
    }
}

/// Dummy flash device
///
/// Emulates an S25FL flash chip in memory for testing purposes.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    log: Vec<Vec<u8>>,
    error_bits: u8,
    protect_bits: u8,
    status_reg2: u8,
    config_reg: u8,
    write_enabled: bool,
    wip_remaining: u32,
    stalled: bool,
    programs: usize,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            log: Vec::new(),
            error_bits: 0,
            protect_bits: 0,
            status_reg2: 0,
            config_reg: 0,
            write_enabled: false,
            wip_remaining: 0,
            stalled: false,
            programs: 0,
        }
    }

    /// Create a new dummy flash with default configuration (S25FL512S)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every frame received so far, in order
    pub fn command_log(&self) -> &[Vec<u8>] {
        &self.log
    }

    /// Forget the recorded frames
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Whether the write enable latch is set
    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Whether an erase or program cycle is still running
    pub fn is_write_in_progress(&self) -> bool {
        self.stalled || self.wip_remaining > 0
    }

    fn status_reg1(&self) -> u8 {
        let mut status = self.error_bits | self.protect_bits;
        if self.write_enabled {
            status |= opcodes::SR1_WEL;
        }
        if self.is_write_in_progress() {
            status |= opcodes::SR1_WIP;
        }
        status
    }

    fn start_cycle(&mut self) {
        self.write_enabled = false;
        self.wip_remaining = self.config.busy_polls;
    }

    /// Wrap an address into the array
    fn wrap(&self, addr: u32) -> usize {
        addr as usize % self.data.len()
    }

    fn handle_status_read(&mut self, out: &mut [u8]) {
        // The register is clocked out repeatedly until CS rises
        let status = self.status_reg1();
        out[1..].fill(status);
        if self.wip_remaining > 0 {
            self.wip_remaining -= 1;
        }
    }

    fn handle_read(&self, tx: &[u8], width: AddressWidth, out: &mut [u8]) {
        let Some(addr) = address(tx, width) else {
            return;
        };
        let header = 1 + width.bytes();
        let start = self.wrap(addr);
        for (i, byte) in out[header..].iter_mut().enumerate() {
            *byte = self.data[(start + i) % self.data.len()];
        }
    }

    fn handle_page_program(&mut self, tx: &[u8], width: AddressWidth) {
        let Some(addr) = address(tx, width) else {
            return;
        };
        if !self.write_enabled {
            log::debug!("dummy: page program at 0x{:08X} without WREN ignored", addr);
            return;
        }

        let page_size = self.config.page_size;
        let addr = self.wrap(addr);
        let page_base = addr - addr % page_size;
        let offset = addr % page_size;

        // Flash programming can only change 1 -> 0, and wraps within the page
        for (i, &byte) in tx[1 + width.bytes()..].iter().enumerate() {
            self.data[page_base + (offset + i) % page_size] &= byte;
        }

        self.programs += 1;
        if self.config.stall_program == Some(self.programs) {
            log::debug!("dummy: program #{} stalls", self.programs);
            self.stalled = true;
        }
        self.start_cycle();
    }

    fn handle_sector_erase(&mut self, tx: &[u8], width: AddressWidth) {
        let Some(addr) = address(tx, width) else {
            return;
        };
        if !self.write_enabled {
            log::debug!("dummy: sector erase at 0x{:08X} without WREN ignored", addr);
            return;
        }

        let sector_size = self.config.sector_size;
        let addr = self.wrap(addr);
        let aligned_addr = addr - addr % sector_size;
        let end = core::cmp::min(aligned_addr + sector_size, self.data.len());

        // Erase sets all bytes to 0xFF
        self.data[aligned_addr..end].fill(0xFF);
        self.start_cycle();
    }

    fn handle_bulk_erase(&mut self) {
        if !self.write_enabled {
            log::debug!("dummy: bulk erase without WREN ignored");
            return;
        }
        self.data.fill(0xFF);
        self.start_cycle();
    }

    fn handle_write_registers(&mut self, tx: &[u8]) {
        if !self.write_enabled {
            log::debug!("dummy: register write without WREN ignored");
            return;
        }
        // A one byte payload leaves the configuration register untouched
        if let Some(&status) = tx.get(1) {
            self.protect_bits = status & opcodes::SR1_WRITABLE;
        }
        if let Some(&config) = tx.get(2) {
            self.config_reg = config;
        }
        self.start_cycle();
    }

    fn handle_rems(&self, tx: &[u8], out: &mut [u8]) {
        let Some(addr) = address(tx, AddressWidth::ThreeByte) else {
            return;
        };
        // Address bit 0 selects which ID comes first; the pair then repeats
        let ids = [self.config.manufacturer_id, self.config.device_id];
        for (i, byte) in out[4..].iter_mut().enumerate() {
            *byte = ids[(i + (addr & 1) as usize) % 2];
        }
    }

    fn handle_identification(&self, out: &mut [u8]) {
        for (byte, id) in out[1..].iter_mut().zip(self.config.jedec_id) {
            *byte = id;
        }
    }

    fn handle_signature(&self, out: &mut [u8]) {
        // Three dummy bytes, then the signature repeats
        if out.len() > 4 {
            out[4..].fill(self.config.signature);
        }
    }

    /// Decode and execute one frame, filling `out` with what the device
    /// clocks back
    fn execute(&mut self, tx: &[u8], out: &mut [u8]) {
        let opcode = tx[0];

        let allowed_while_busy = matches!(
            opcode,
            opcodes::RDSR1
                | opcodes::RDSR2
                | opcodes::RDCR
                | opcodes::RDID
                | opcodes::REMS
                | opcodes::RES
        );
        if self.is_write_in_progress() && !allowed_while_busy {
            log::debug!("dummy: opcode 0x{:02X} ignored while busy", opcode);
            return;
        }

        match opcode {
            // Identification
            opcodes::RDID => self.handle_identification(out),
            opcodes::REMS => self.handle_rems(tx, out),
            opcodes::RES => self.handle_signature(out),

            // Registers
            opcodes::RDSR1 => self.handle_status_read(out),
            opcodes::RDSR2 => out[1..].fill(self.status_reg2),
            opcodes::RDCR => out[1..].fill(self.config_reg),
            opcodes::CLSR => self.error_bits = 0,
            opcodes::WRR => self.handle_write_registers(tx),

            // Write enable/disable
            opcodes::WREN => self.write_enabled = true,
            opcodes::WRDI => self.write_enabled = false,

            // Reads
            opcodes::READ => self.handle_read(tx, AddressWidth::ThreeByte, out),
            opcodes::READ_4B => self.handle_read(tx, AddressWidth::FourByte, out),

            // Page program
            opcodes::PP => self.handle_page_program(tx, AddressWidth::ThreeByte),
            opcodes::PP_4B => self.handle_page_program(tx, AddressWidth::FourByte),

            // Erase
            opcodes::SE => self.handle_sector_erase(tx, AddressWidth::ThreeByte),
            opcodes::SE_4B => self.handle_sector_erase(tx, AddressWidth::FourByte),
            opcodes::BE => self.handle_bulk_erase(),

            // Reset
            opcodes::RESET => {
                self.write_enabled = false;
                self.error_bits = 0;
            }
            opcodes::MBR => {}

            _ => log::warn!("dummy: unsupported opcode 0x{:02X} ignored", opcode),
        }
    }
}

/// Address following the opcode, or `None` for a truncated frame
fn address(tx: &[u8], width: AddressWidth) -> Option<u32> {
    let bytes = tx.get(1..1 + width.bytes())?;
    Some(width.decode(bytes))
}

impl SpiPort for DummyFlash {
    fn exchange(&mut self, tx: &[u8], rx: Option<&mut [u8]>) -> Result<()> {
        if tx.is_empty() {
            return Err(Error::TransportFailure);
        }
        if let Some(rx) = &rx {
            if rx.len() != tx.len() {
                return Err(Error::TransportFailure);
            }
        }

        self.log.push(tx.to_vec());

        let mut out = vec![FILLER; tx.len()];
        self.execute(tx, &mut out);
        if let Some(rx) = rx {
            rx.copy_from_slice(&out);
        }
        Ok(())
    }
}

/// Parse a size such as `1048576`, `0x100000`, `1024K` or `64M`
fn parse_size(value: &str) -> Option<usize> {
    let (digits, scale) = if let Some(v) = value.strip_suffix(['K', 'k']) {
        (v, 1024)
    } else if let Some(v) = value.strip_suffix(['M', 'm']) {
        (v, 1024 * 1024)
    } else {
        (value, 1)
    };

    let n = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    n.checked_mul(scale)
}

/// Parse programmer options from a list of key-value pairs
///
/// - `size=<bytes>` - array size, accepts `K`/`M` suffixes and `0x` prefix
/// - `busy=<n>` - status reads that report WIP after each erase or program
/// - `stall=<n>` - page program (1-based) after which WIP never clears
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "size" => {
                let size =
                    parse_size(value).ok_or_else(|| format!("Invalid size value: {}", value))?;
                if size == 0 || size % config.sector_size != 0 || size > u32::MAX as usize {
                    return Err(format!(
                        "Invalid size: {} (must be a non-zero multiple of {} bytes)",
                        value, config.sector_size
                    ));
                }
                config.size = size;
            }
            "busy" => {
                config.busy_polls = value
                    .parse()
                    .map_err(|_| format!("Invalid busy value: {}", value))?;
            }
            "stall" => {
                let n: usize = value
                    .parse()
                    .map_err(|_| format!("Invalid stall value: {}", value))?;
                config.stall_program = Some(n);
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
