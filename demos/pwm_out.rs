use std::{thread, time::Duration};
use singleboard_hw::{
    gpio::{GpioMode, GpioPin},
    RaspberryPi, Result,
};

// GPIO18 carries PWM0 through ALT5
const PWM_PIN_NUM: u8 = 18;

fn main() -> Result<()> {
    env_logger::init();
    let board = RaspberryPi::open()?;
    println!("Capabilities: {:?}", board.capabilities());

    let mut gpio = board.gpio()?;
    let mut pwm = match board.pwm() {
        Ok(pwm) => pwm,
        Err(e) => {
            eprintln!("Error mapping clock/PWM registers: {}", e);
            eprintln!("Hardware PWM needs /dev/mem; run as root.");
            return Err(e);
        }
    };

    let pwm_pin = GpioPin::new(PWM_PIN_NUM)?;
    let channel = pwm.enable_pin(&mut gpio, pwm_pin)?;
    println!("Routed {:?} to pin {}", channel, pwm_pin.number());

    // ~1 kHz, 75% duty cycle
    let target_freq_hz = 1000.0;
    let duty_cycle = 75.0;
    let period_ns = (1_000_000_000.0 / target_freq_hz) as u64;

    println!(
        "Target Freq: {:.1} Hz, Duty: {:.1}%, Period: {} ns",
        target_freq_hz, duty_cycle, period_ns
    );
    pwm.start(channel, period_ns, duty_cycle)?;
    println!("PWM CTL: {:?}", pwm.control());

    println!("PWM running for 5 seconds (Press Ctrl+C to stop early)...");
    thread::sleep(Duration::from_secs(5));

    println!("Stopping PWM output...");
    pwm.stop(channel);
    pwm.disable();

    // Set pin back to input
    gpio.set_mode(pwm_pin, GpioMode::Input)?;
    println!("PWM example finished.");
    Ok(())
}
