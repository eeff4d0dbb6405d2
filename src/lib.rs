//! # singleboard-hw
//!
//! A Rust crate for driving the GPIO, hardware PWM and I²C peripherals of a
//! Raspberry Pi (BCM2835, BCM2836 and BCM2837) from Linux user space.
//!
//! GPIO and PWM are reached by mapping the SoC's register blocks through
//! `/dev/gpiomem` or `/dev/mem`; I²C goes through the kernel's `i2c-dev`
//! interface (`/dev/i2c-N`).
//!
//! ## Features
//!
//! *   Board detection from `uname` (`RaspberryPi::open`, `peripheral_base_for_machine`).
//! *   Register windows over a single mapped page (`map_window`), with a heap-backed
//!     `MemoryWindow` for dry runs.
//! *   GPIO control:
//!     *   Strongly-typed `GpioPin` and `PinSet` (bank 0, pins 0-31).
//!     *   Setting/getting pin function (`set_mode`, `get_mode`).
//!     *   Writing and reading levels of whole pin sets (`set_level`, `get_level`).
//!     *   Pull-up/pull-down latching (`set_pullup`).
//! *   Hardware PWM:
//!     *   250 MHz PWM clock from PLLD (`enable`, `disable`).
//!     *   Mark-space output by period and duty cycle (`start`, `stop`).
//!     *   Pin routing for GPIO12/13/18/19 (`enable_pin`).
//! *   I²C / SMBus:
//!     *   Lazily opened buses with address-switch caching (`I2cBus`).
//!     *   Raw reads/writes, SMBus byte, word and block transfers (`I2cEndpoint`).
//!     *   Typed payloads via `I2cReadable` / `I2cWritable`.
//!     *   Bus scanning (`scan`, `scan_default`).
//! *   Drivers for the MCP4725 DAC and the PCA9685 PWM expander.
//!
//! ## Installation
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! singleboard-hw = "0.1.0"
//! log = "0.4"          # Optional, for logging
//!
//! [dev-dependencies]   # For demos/tests
//! env_logger = "0.11"
//! ```
//!
//! ## Basic Usage
//!
//! ```no_run
//! use singleboard_hw::{GpioLevel, GpioMode, GpioPin, PinSet, PwmChannel, RaspberryPi, Result};
//! use std::{thread, time::Duration};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let board = RaspberryPi::open()?;
//!     println!("Capabilities: {:?}", board.capabilities());
//!
//!     // --- GPIO Example (GPIO17) ---
//!     let mut gpio = board.gpio()?;
//!     let led = GpioPin::new(17)?;
//!     gpio.set_mode(led, GpioMode::Output)?;
//!     gpio.set_level(PinSet::from(led), GpioLevel::High);
//!     thread::sleep(Duration::from_millis(200));
//!     gpio.set_level(PinSet::from(led), GpioLevel::Low);
//!
//!     // --- PWM Example (GPIO18, 1 kHz, 25%) ---
//!     let mut pwm = board.pwm()?;
//!     let channel = pwm.enable_pin(&mut gpio, GpioPin::new(18)?)?;
//!     pwm.start(channel, 1_000_000, 25.0)?;
//!     thread::sleep(Duration::from_secs(1));
//!     pwm.stop(PwmChannel::Pwm0);
//!
//!     // --- I2C Example ---
//!     let mut bus = board.i2c_bus(1)?;
//!     for address in bus.scan_default()? {
//!         println!("Found device at {}", address);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Hardware Setup Notes
//!
//! *   **Permissions:** `/dev/gpiomem` is usable by members of the `gpio` group. The
//!     clock manager and PWM blocks are only reachable through `/dev/mem`, which needs root.
//! *   **I²C:** Enable the bus (`dtparam=i2c_arm=on` in `/boot/config.txt`) and add the user
//!     to the `i2c` group for `/dev/i2c-1`.
//! *   **Audio:** The analog audio output uses the PWM block too; disable it
//!     (`dtparam=audio=off`) before using hardware PWM.
//! *   **GPIO Voltage Levels:** 3.3V logic. Pins are not 5V tolerant.
//!
//! ## License
//!
//! This project is licensed under the MIT license.

pub mod board;
pub mod clock;
pub mod codec;
mod consts;
pub mod delay;
pub mod drivers;
mod error;
pub mod gpio;
pub mod i2c;
pub mod mmap;
pub mod pwm;
pub mod registers;

pub use board::{BoardConfig, Capabilities, RaspberryPi};
pub use codec::{I2cReadable, I2cWritable};
pub use delay::{Delay, ThreadDelay};
pub use error::{Error, Result};
pub use gpio::{GpioController, GpioLevel, GpioMode, GpioPin, GpioPull, PinSet};
pub use i2c::{I2cAddress, I2cBus, I2cEndpoint, I2cTransport};
pub use mmap::{map_window, MappedWindow, MemoryWindow, RegisterWindow};
pub use pwm::{PwmChannel, PwmController};
