//! S25FL command opcodes
//!
//! The subset of the S25FL512S command set used by this crate. Opcodes are
//! protocol constants; the `_4B` variants carry a 4-byte address regardless
//! of the bank address register.

use super::AddressWidth;

// ============================================================================
// Identification
// ============================================================================

/// Read Electronic Manufacturer & Device ID
pub const REMS: u8 = 0x90;
/// Read JEDEC Identification
pub const RDID: u8 = 0x9F;
/// Read Electronic Signature
pub const RES: u8 = 0xAB;

// ============================================================================
// Status and configuration registers
// ============================================================================

/// Read Status Register 1
pub const RDSR1: u8 = 0x05;
/// Read Status Register 2
pub const RDSR2: u8 = 0x07;
/// Read Configuration Register
pub const RDCR: u8 = 0x35;
/// Clear Status Register (resets E_ERR and P_ERR)
pub const CLSR: u8 = 0x30;
/// Write Registers (Status Register 1, then Configuration Register)
pub const WRR: u8 = 0x01;

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears the WEL bit
pub const WRDI: u8 = 0x04;

// ============================================================================
// Reset
// ============================================================================

/// Software Reset
pub const RESET: u8 = 0xF0;
/// Mode Bit Reset - exits continuous read mode
pub const MBR: u8 = 0xFF;

// ============================================================================
// Read
// ============================================================================

/// Read with 3-byte address
pub const READ: u8 = 0x03;
/// Read with 4-byte address
pub const READ_4B: u8 = 0x13;

// ============================================================================
// Program
// ============================================================================

/// Page Program with 3-byte address
pub const PP: u8 = 0x02;
/// Page Program with 4-byte address
pub const PP_4B: u8 = 0x12;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase with 3-byte address
pub const SE: u8 = 0xD8;
/// Sector Erase with 4-byte address
pub const SE_4B: u8 = 0xDC;
/// Bulk Erase (entire array)
pub const BE: u8 = 0xC7;

// ============================================================================
// Status register bit definitions
// ============================================================================

/// Status Register 1: Write In Progress
pub const SR1_WIP: u8 = 0x01;
/// Status Register 1: Write Enable Latch
pub const SR1_WEL: u8 = 0x02;
/// Status Register 1: Erase Error
pub const SR1_E_ERR: u8 = 0x20;
/// Status Register 1: Program Error
pub const SR1_P_ERR: u8 = 0x40;
/// Status Register 1: bits written by WRR (block protect BP0-BP2 and SRWD)
pub const SR1_WRITABLE: u8 = 0x9C;

/// Pick the read opcode for an address width
pub const fn read_opcode(width: AddressWidth) -> u8 {
    match width {
        AddressWidth::FourByte => READ_4B,
        _ => READ,
    }
}

/// Pick the page program opcode for an address width
pub const fn program_opcode(width: AddressWidth) -> u8 {
    match width {
        AddressWidth::FourByte => PP_4B,
        _ => PP,
    }
}

/// Pick the sector erase opcode for an address width
pub const fn erase_opcode(width: AddressWidth) -> u8 {
    match width {
        AddressWidth::FourByte => SE_4B,
        _ => SE,
    }
}
