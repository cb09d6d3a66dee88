//! s25fl - Command line tool for S25FL serial NOR flash
//!
//! Identifies, reads, erases and programs an S25FL512S-class device through
//! one of the compiled-in programmers:
//! - **dummy** - In-memory emulator, for trying things out without hardware
//! - **linux_spi** - A spidev character device on a Linux SPI controller
//!
//! All device access goes through `s25fl_core::flash::Flash`, which owns the
//! transport for the lifetime of the command.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use programmers::open_flash;

/// Default log filter for a `-v` count; `RUST_LOG` still takes precedence
fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(cli.verbose)),
    )
    .init();

    let programmer = cli.programmer.as_deref();

    let result = match cli.command {
        Commands::Id => {
            let mut flash = open_flash(programmer)?;
            commands::run_id(&mut flash)
        }
        Commands::Status => {
            let mut flash = open_flash(programmer)?;
            commands::run_status(&mut flash)
        }
        Commands::Read {
            address,
            length,
            output,
        } => {
            let mut flash = open_flash(programmer)?;
            commands::run_read(&mut flash, address, length as usize, &output)
        }
        Commands::Erase {
            address,
            length,
            all,
        } => {
            let mut flash = open_flash(programmer)?;
            match (all, address, length) {
                (true, _, _) => commands::run_bulk_erase(&mut flash),
                (false, Some(address), Some(length)) => {
                    commands::run_erase(&mut flash, address, length as usize)
                }
                _ => Err("erase needs --address and --length, or --all".into()),
            }
        }
        Commands::Write {
            address,
            input,
            no_erase,
            no_verify,
        } => {
            let mut flash = open_flash(programmer)?;
            commands::run_write(&mut flash, address, &input, no_erase, no_verify)
        }
        Commands::Verify { address, input } => {
            let mut flash = open_flash(programmer)?;
            commands::run_verify(&mut flash, address, &input)
        }
        Commands::Reset => {
            let mut flash = open_flash(programmer)?;
            commands::run_reset(&mut flash)
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    };

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_log_filter() {
        assert_eq!(default_log_filter(0), "info");
        assert_eq!(default_log_filter(1), "debug");
        assert_eq!(default_log_filter(2), "trace");
        assert_eq!(default_log_filter(5), "trace");
    }

    #[test]
    fn test_debug_filter_enables_debug_records() {
        let logger = env_logger::Builder::new()
            .parse_filters(default_log_filter(1))
            .build();
        let debug = log::Metadata::builder()
            .level(log::Level::Debug)
            .target("s25fl_core::protocol")
            .build();
        let trace = log::Metadata::builder()
            .level(log::Level::Trace)
            .target("s25fl_core::protocol")
            .build();
        assert!(log::Log::enabled(&logger, &debug));
        assert!(!log::Log::enabled(&logger, &trace));

        let logger = env_logger::Builder::new()
            .parse_filters(default_log_filter(0))
            .build();
        assert!(!log::Log::enabled(&logger, &debug));
    }
}
