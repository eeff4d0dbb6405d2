use singleboard_hw::{RaspberryPi, Result};

const I2C_BUS: u8 = 1;

fn main() -> Result<()> {
    env_logger::init();
    let board = RaspberryPi::open()?;
    let mut bus = board.i2c_bus(I2C_BUS)?;

    println!(
        "Scanning {} (7-bit addresses 0x08 to 0x77)...",
        bus.path()
    );
    let found_devices = match bus.scan_default() {
        Ok(found) => found,
        Err(e) => {
            eprintln!("Error scanning bus: {}", e);
            eprintln!("Ensure I2C is enabled and the user is in the 'i2c' group.");
            return Err(e);
        }
    };

    for addr in &found_devices {
        println!("Device found at {}", addr);
    }

    if found_devices.is_empty() {
        println!("No I2C devices found.");
    } else {
        println!(
            "Scan complete. Found addresses: {:?}",
            found_devices
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
        );
    }

    Ok(())
}
