// Device discovery example
//
// This example lists the serial devices present on this machine.

use serial_lines::{DeviceDirectory, SystemDirectory};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (optional)
    env_logger::init();

    println!("Serial Device Discovery");
    println!("=======================\n");

    let devices = SystemDirectory.query()?;
    if devices.is_empty() {
        println!("No serial devices found. Connect a device and try again.");
        return Ok(());
    }

    println!("Found {} device(s):", devices.len());
    for (i, device) in devices.iter().enumerate() {
        println!("  {}. {} at {}", i + 1, device.friendly_name, device.port_name);
    }
    println!();

    // Same information through the non-failing helpers
    SystemDirectory.print_devices();

    Ok(())
}
