//! spidev node settings and programmer option parsing

use crate::error::{Result, SpidevError};
use std::path::PathBuf;

/// Clock used when `spispeed` is not given
pub const DEFAULT_CLOCK_HZ: u32 = 2_000_000;

/// Clock polarity/phase combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Value written with SPI_IOC_WR_MODE
    pub fn bits(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }
}

impl TryFrom<u8> for SpiMode {
    type Error = SpidevError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SpiMode::Mode0),
            1 => Ok(SpiMode::Mode1),
            2 => Ok(SpiMode::Mode2),
            3 => Ok(SpiMode::Mode3),
            _ => Err(SpidevError::Option(format!(
                "SPI mode {} out of range (0-3)",
                value
            ))),
        }
    }
}

/// Settings applied when a spidev node is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpidevConfig {
    /// Character device, e.g. `/dev/spidev0.0`
    pub path: PathBuf,
    /// SCK frequency in Hz
    pub clock_hz: u32,
    /// Clock polarity and phase
    pub mode: SpiMode,
}

impl SpidevConfig {
    /// Settings for `path` at the default clock in mode 0
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock_hz: DEFAULT_CLOCK_HZ,
            mode: SpiMode::Mode0,
        }
    }

    /// Override the clock frequency
    pub fn with_clock_hz(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    /// Override the SPI mode
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build settings from `key=value` programmer options
    ///
    /// Recognised keys are `dev` (required), `spispeed` in kHz and `mode`.
    pub fn from_options(options: &[(&str, &str)]) -> Result<Self> {
        let mut path = None;
        let mut clock_hz = DEFAULT_CLOCK_HZ;
        let mut mode = SpiMode::Mode0;

        for &(key, value) in options {
            match key {
                "dev" => path = Some(PathBuf::from(value)),
                "spispeed" => {
                    let khz: u32 = value.parse().map_err(|_| {
                        SpidevError::Option(format!("bad spispeed '{}'", value))
                    })?;
                    clock_hz = khz.checked_mul(1000).filter(|hz| *hz > 0).ok_or_else(|| {
                        SpidevError::Option(format!("spispeed {} kHz out of range", khz))
                    })?;
                }
                "mode" => {
                    let raw: u8 = value
                        .parse()
                        .map_err(|_| SpidevError::Option(format!("bad mode '{}'", value)))?;
                    mode = SpiMode::try_from(raw)?;
                }
                _ => log::warn!("linux_spi: ignoring option {}={}", key, value),
            }
        }

        let path = path.ok_or_else(|| {
            SpidevError::Option("missing dev=/dev/spidevX.Y".to_string())
        })?;
        Ok(Self {
            path,
            clock_hz,
            mode,
        })
    }
}
