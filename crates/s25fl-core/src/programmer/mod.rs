//! Transport abstractions
//!
//! This module defines the traits a transport backend and a time source
//! implement so the protocol layer can drive a flash device.

mod traits;

pub use traits::*;
