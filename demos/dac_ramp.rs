use std::{thread, time::Duration};
use singleboard_hw::{
    drivers::mcp4725::{self, Mcp4725, PowerDownMode},
    RaspberryPi, Result,
};

const I2C_BUS: u8 = 1;
const STEPS: u16 = 16;

fn main() -> Result<()> {
    env_logger::init();
    let board = RaspberryPi::open()?;
    let mut bus = board.i2c_bus(I2C_BUS)?;

    println!("Looking for MCP4725 at 0x{:02X}...", mcp4725::DEFAULT_ADDRESS);
    let mut dac = Mcp4725::new(&mut bus, mcp4725::DEFAULT_ADDRESS)?;
    let (code, mode) = dac.read_voltage()?;
    println!("Current output: code {} ({:?})", code, mode);

    println!("Ramping output in {} steps...", STEPS);
    for step in 0..=STEPS {
        let code = (mcp4725::MAX_CODE as u32 * step as u32 / STEPS as u32) as u16;
        dac.set_voltage(code, PowerDownMode::Normal)?;
        println!("  code {:4}", code);
        thread::sleep(Duration::from_millis(100));
    }

    dac.set_voltage(0, PowerDownMode::Normal)?;
    println!("DAC example finished.");
    Ok(())
}
