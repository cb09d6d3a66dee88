//! CLI command implementations
//!
//! Every command works on a [`Flash`](s25fl_core::flash::Flash) handle and is
//! generic over the transport, so the same code drives the emulator and
//! real hardware.

mod erase;
mod ident;
mod list;
mod read;
mod write;

pub use erase::{run_bulk_erase, run_erase};
pub use ident::{run_id, run_reset, run_status};
pub use list::list_programmers;
pub use read::run_read;
pub use write::{run_verify, run_write};

use indicatif::{ProgressBar, ProgressStyle};

/// Bytes handed to the flash per progress update
const CHUNK_SIZE: usize = 4096;

/// Byte-count progress bar labelled with `phase`
fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}
