//! Device geometry, timeouts and identification layout

use crate::spi::AddressWidth;

/// Page size of the S25FL512S family
pub const PAGE_SIZE: usize = 256;
/// Uniform sector size of the S25FL512S family (256 KiB)
pub const SECTOR_SIZE: u32 = 0x0004_0000;
/// Total size of the S25FL512S (512 Mbit)
pub const TOTAL_SIZE: u32 = 64 * 1024 * 1024;

/// Physical layout of the flash array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Largest region a single program command may write
    pub page_size: usize,
    /// Smallest erasable region
    pub sector_size: u32,
    /// Size of the whole array in bytes
    pub total_size: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            sector_size: SECTOR_SIZE,
            total_size: TOTAL_SIZE,
        }
    }
}

impl Geometry {
    /// Check that `[addr, addr + len)` lies inside the array
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        addr as u64 + len as u64 <= self.total_size as u64
    }

    /// Check that an address sits on a sector boundary
    ///
    /// Always false for a zero sector size.
    pub fn is_sector_aligned(&self, addr: u32) -> bool {
        self.sector_size != 0 && addr % self.sector_size == 0
    }
}

/// Ready-wait budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Sector erase
    pub erase_ms: u32,
    /// Page program
    pub program_ms: u32,
    /// Bulk (whole chip) erase
    pub bulk_erase_ms: u32,
    /// Status/configuration register write
    pub register_ms: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            erase_ms: 5_000,
            program_ms: 1_000,
            // S25FL512S max bulk erase time is 460s
            bulk_erase_ms: 460_000,
            register_ms: 2_000,
        }
    }
}

/// Where the manufacturer and device bytes sit in a REMS (0x90) response
///
/// Offsets index the raw receive buffer, echo bytes included. Different
/// parts (and different board revisions) clock the ID out at different
/// positions, so check the datasheet before changing the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdLayout {
    /// Number of bytes exchanged, opcode included
    pub frame_len: usize,
    /// Index of the manufacturer ID byte
    pub manufacturer_offset: usize,
    /// Index of the device ID byte
    pub device_offset: usize,
}

impl Default for IdLayout {
    /// Opcode, 24-bit zero address, then manufacturer and device ID
    fn default() -> Self {
        Self {
            frame_len: 6,
            manufacturer_offset: 4,
            device_offset: 5,
        }
    }
}

impl IdLayout {
    /// Layout with explicit offsets into a `frame_len` byte exchange
    pub const fn new(frame_len: usize, manufacturer_offset: usize, device_offset: usize) -> Self {
        Self {
            frame_len,
            manufacturer_offset,
            device_offset,
        }
    }
}

/// Everything needed to drive one flash device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    /// Array geometry
    pub geometry: Geometry,
    /// Ready-wait budgets
    pub timeouts: Timeouts,
    /// Address width, selects the 3- or 4-byte opcode variants
    pub address_width: AddressWidth,
    /// REMS response layout
    pub id_layout: IdLayout,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            timeouts: Timeouts::default(),
            address_width: AddressWidth::FourByte,
            id_layout: IdLayout::default(),
        }
    }
}

impl FlashConfig {
    /// Set the array geometry
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the ready-wait budgets
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the address width
    pub fn with_address_width(mut self, width: AddressWidth) -> Self {
        self.address_width = width;
        self
    }

    /// Set the REMS response layout
    pub fn with_id_layout(mut self, layout: IdLayout) -> Self {
        self.id_layout = layout;
        self
    }
}
