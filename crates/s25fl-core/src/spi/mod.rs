//! SPI frame types and opcodes
//!
//! This module provides the address encoding, the command frame codec
//! and the S25FL opcode table.

mod address;
mod frame;
pub mod opcodes;

pub use address::AddressWidth;
pub use frame::{decode, encode_addressed, CommandFrame, FrameBuf, FILLER, MAX_FRAME_LEN};
pub use opcodes::*;
