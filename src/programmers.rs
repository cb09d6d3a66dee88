//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use s25fl_core::flash::Flash;
use s25fl_core::programmer::{SpiPort, StdClock};
use s25fl_core::FlashConfig;
use thiserror::Error;

/// Flash handle over whichever transport was selected at runtime
pub type FlashHandle = Flash<Box<dyn SpiPort>, StdClock>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Errors raised while selecting and opening a programmer
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// No `-p` given for a command that talks to the flash
    #[error("No programmer specified. Use -p <programmer>\n\n{0}")]
    NotSpecified(String),

    /// Name did not match any compiled-in programmer
    #[error("Unknown programmer: {name}\n\n{help}\nUse 's25fl list-programmers' for more details")]
    Unknown { name: String, help: String },

    /// Options string could not be parsed
    #[error("Invalid {programmer} parameters: {message}")]
    InvalidOptions {
        programmer: &'static str,
        message: String,
    },

    /// The transport could not be opened
    #[error("Failed to open {programmer}: {source}")]
    OpenFailed {
        programmer: &'static str,
        #[source]
        source: Box<dyn std::error::Error>,
    },
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory S25FL512S emulator (size=<bytes>,busy=<n>,stall=<n>)",
    });

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to its primary programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open the programmer named by `programmer` and wrap it in a flash handle
///
/// The programmer string can be just the name (e.g., "dummy") or include
/// parameters (e.g., "linux_spi:dev=/dev/spidev0.0,spispeed=4000").
pub fn open_flash(programmer: Option<&str>) -> Result<FlashHandle, ProgrammerError> {
    let programmer = programmer.ok_or_else(|| ProgrammerError::NotSpecified(programmer_help()))?;
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = find_programmer(name).ok_or_else(|| ProgrammerError::Unknown {
        name: name.to_string(),
        help: programmer_help(),
    })?;

    let (port, config): (Box<dyn SpiPort>, FlashConfig) = match canonical_name {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let dummy = s25fl_dummy::parse_options(&options).map_err(|message| {
                ProgrammerError::InvalidOptions {
                    programmer: "dummy",
                    message,
                }
            })?;
            log::info!("Using dummy flash ({} bytes)", dummy.size);
            let config = FlashConfig::default().with_geometry(dummy.geometry());
            let port: Box<dyn SpiPort> = Box::new(s25fl_dummy::DummyFlash::new(dummy));
            (port, config)
        }

        #[cfg(feature = "linux-spi")]
        "linux_spi" => {
            let port = s25fl_linux_spi::open_from_options(&options).map_err(|e| match e {
                s25fl_linux_spi::SpidevError::Option(message) => ProgrammerError::InvalidOptions {
                    programmer: "linux_spi",
                    message,
                },
                other => ProgrammerError::OpenFailed {
                    programmer: "linux_spi",
                    source: Box::new(other),
                },
            })?;
            let port: Box<dyn SpiPort> = Box::new(port);
            (port, FlashConfig::default())
        }

        _ => {
            return Err(ProgrammerError::Unknown {
                name: name.to_string(),
                help: programmer_help(),
            })
        }
    };

    Ok(Flash::new(port, StdClock::new(), config))
}
