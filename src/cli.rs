//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "s25fl")]
#[command(author, version, about = "S25FL serial NOR flash tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Programmer, optionally with options (e.g. linux_spi:dev=/dev/spidev0.0)
    #[arg(short, long, global = true, help = programmer_help())]
    pub programmer: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reset the device and print its identification
    Id,

    /// Print the status and configuration registers
    Status,

    /// Read flash contents to file
    Read {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Number of bytes to read (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: u32,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Erase sectors, or the whole chip with --all
    Erase {
        /// Start address, must be sector aligned (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, required_unless_present = "all")]
        address: Option<u32>,

        /// Length of region to erase, a multiple of the sector size
        #[arg(short, long, value_parser = parse_hex_u32, required_unless_present = "all")]
        length: Option<u32>,

        /// Erase the whole chip
        #[arg(long, conflicts_with_all = ["address", "length"])]
        all: bool,
    },

    /// Write file to flash
    Write {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Don't erase the covered sectors before writing
        #[arg(long)]
        no_erase: bool,

        /// Don't read back and compare after writing
        #[arg(long)]
        no_verify: bool,
    },

    /// Verify flash contents against file
    Verify {
        /// Start address (hex or decimal)
        #[arg(short, long, value_parser = parse_hex_u32, default_value = "0")]
        address: u32,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Issue a software reset
    Reset,

    /// List supported programmers
    ListProgrammers,
}
