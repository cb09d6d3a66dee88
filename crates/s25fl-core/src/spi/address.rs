//! Address width types

/// Address width for SPI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressWidth {
    /// No address phase
    #[default]
    None,
    /// 3-byte (24-bit) address - supports up to 16 MiB
    ThreeByte,
    /// 4-byte (32-bit) address - supports up to 4 GiB
    FourByte,
}

impl AddressWidth {
    /// Returns the number of address bytes
    pub const fn bytes(&self) -> usize {
        match self {
            Self::None => 0,
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Returns true if `address` can be sent with this width without truncation
    ///
    /// [`None`](Self::None) carries no address, so nothing fits.
    pub const fn fits(&self, address: u32) -> bool {
        match self {
            Self::None => false,
            Self::ThreeByte => address <= 0x00FF_FFFF,
            Self::FourByte => true,
        }
    }

    /// Encode an address into `buf`, most significant byte first
    ///
    /// Writes exactly [`bytes()`](Self::bytes) bytes. Bits above the width
    /// are dropped.
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        let be = address.to_be_bytes();
        let width = self.bytes();
        buf[..width].copy_from_slice(&be[4 - width..]);
    }

    /// Decode a big-endian address of this width from the start of `buf`
    pub fn decode(&self, buf: &[u8]) -> u32 {
        buf[..self.bytes()]
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
    }
}
