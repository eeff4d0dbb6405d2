use std::{thread, time::Duration};
use singleboard_hw::{
    gpio::{GpioLevel, GpioMode, GpioPin, GpioPull, PinSet},
    RaspberryPi, Result,
};

// Header pin 11
const BLINK_PIN_NUM: u8 = 17;

fn main() -> Result<()> {
    env_logger::init();
    println!("Detecting board...");
    let board = RaspberryPi::open()?;
    println!(
        "Board detected. Peripheral base 0x{:08X}",
        board.peripheral_base()
    );

    let mut gpio = match board.gpio() {
        Ok(gpio) => gpio,
        Err(e) => {
            eprintln!("Error mapping GPIO registers: {}", e);
            eprintln!("Ensure /dev/gpiomem exists and the user is in the 'gpio' group.");
            return Err(e);
        }
    };

    let blink_pin = GpioPin::new(BLINK_PIN_NUM)?;
    let pins = PinSet::from(blink_pin);

    println!("Configuring pin {} for blinking...", blink_pin.number());
    gpio.set_mode(blink_pin, GpioMode::Output)?;
    gpio.set_pullup(pins, GpioPull::None);

    println!("Blinking pin {} (Press Ctrl+C to stop)", blink_pin.number());
    loop {
        gpio.set_level(pins, GpioLevel::High);
        thread::sleep(Duration::from_millis(250));
        gpio.set_level(pins, GpioLevel::Low);
        thread::sleep(Duration::from_millis(250));
    }
}
