//! Identification, status and reset commands

use s25fl_core::flash::Flash;
use s25fl_core::programmer::{SpiPort, TickSource};
use s25fl_core::protocol::StatusRegister;

/// Reset the device and print every identification it offers
pub fn run_id<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = flash.init()?;
    let jedec = flash.read_jedec_id()?;
    let signature = flash.read_electronic_signature()?;

    println!("Manufacturer ID: 0x{:02X}", id.manufacturer);
    println!("Device ID:       0x{:02X}", id.device);
    println!(
        "JEDEC ID:        {} (device 0x{:04X})",
        jedec,
        jedec.device()
    );
    println!("Signature:       0x{:02X}", signature);

    let geometry = flash.config().geometry;
    println!(
        "Geometry:        {} bytes, {} byte pages, {} byte sectors",
        geometry.total_size, geometry.page_size, geometry.sector_size
    );
    Ok(())
}

/// Render the named bits of Status Register 1
fn describe_status(status: StatusRegister) -> String {
    let names: Vec<&str> = status.iter_names().map(|(name, _)| name).collect();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(" ")
    }
}

/// Print the status and configuration registers
pub fn run_status<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = flash.read_status()?;
    let status2 = flash.read_status2()?;
    let config = flash.read_config()?;

    println!("Status 1: 0x{:02X} [{}]", status.bits(), describe_status(status));
    println!("Status 2: 0x{:02X}", status2);
    println!("Config:   0x{:02X}", config);
    Ok(())
}

/// Issue a software reset
pub fn run_reset<P: SpiPort, C: TickSource>(
    flash: &mut Flash<P, C>,
) -> Result<(), Box<dyn std::error::Error>> {
    flash.reset()?;
    println!("Reset issued");
    Ok(())
}
