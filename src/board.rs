//! Board detection and construction of the peripheral controllers.

use crate::consts;
use crate::error::{Error, Result};
use crate::gpio::GpioController;
use crate::i2c::I2cBus;
use crate::pwm::PwmController;
use log::{debug, info, warn};
use std::ffi::CStr;
use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Where and how to reach the board's peripherals.
///
/// The default detects the SoC from `uname` and uses the standard device
/// files, which is what a program running on the Pi itself wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Physical peripheral base; detected from the machine type when `None`.
    pub peripheral_base: Option<u64>,
    /// Candidate device files for the GPIO block, tried in order.
    pub gpio_devices: Vec<PathBuf>,
    /// Candidate device files for the clock manager and PWM blocks.
    pub secure_devices: Vec<PathBuf>,
    /// Kernel indices of the I2C buses wired to the header.
    pub i2c_buses: RangeInclusive<u8>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            peripheral_base: None,
            gpio_devices: consts::gpio::DEVICES.iter().map(PathBuf::from).collect(),
            secure_devices: consts::clock::DEVICES.iter().map(PathBuf::from).collect(),
            i2c_buses: consts::board::DEFAULT_I2C_BUSES,
        }
    }
}

/// What the board offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// GPIO pins addressable through the function-select registers.
    pub gpio_count: u8,
    /// Pins reachable through one [`PinSet`](crate::gpio::PinSet) (bank 0).
    pub pin_set_width: u8,
    /// Hardware PWM channels.
    pub pwm_channels: usize,
    /// I2C bus indices.
    pub i2c_buses: Vec<u8>,
}

/// Peripheral base for a `uname` machine string.
pub fn peripheral_base_for_machine(machine: &str) -> Result<u64> {
    match machine.to_ascii_lowercase().as_str() {
        "armv6l" => Ok(consts::board::PERIPHERAL_BASE_BCM2835),
        "armv7l" | "aarch64" => Ok(consts::board::PERIPHERAL_BASE_BCM2837),
        other => Err(Error::UnsupportedBoard(format!(
            "unknown machine type '{}'",
            other
        ))),
    }
}

/// Machine type of the running kernel, as `uname -m` prints it.
pub fn detect_machine() -> Result<String> {
    let mut info: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut info) } != 0 {
        let e = io::Error::last_os_error();
        warn!("uname failed: {}", e);
        return Err(Error::UnsupportedBoard(format!("uname failed: {}", e)));
    }
    let machine = unsafe { CStr::from_ptr(info.machine.as_ptr()) };
    Ok(machine.to_string_lossy().into_owned())
}

/// A Raspberry Pi (BCM2835/6/7) and the peripherals it exposes.
///
/// Nothing is mapped or opened here; each accessor creates a controller
/// that owns its own mapping or bus handle.
#[derive(Debug, Clone)]
pub struct RaspberryPi {
    config: BoardConfig,
    peripheral_base: u64,
}

impl RaspberryPi {
    /// Detects the running board with the default configuration.
    pub fn open() -> Result<Self> {
        Self::new(BoardConfig::default())
    }

    pub fn new(config: BoardConfig) -> Result<Self> {
        let peripheral_base = match config.peripheral_base {
            Some(base) => base,
            None => {
                let machine = detect_machine()?;
                debug!("Machine type: {}", machine);
                peripheral_base_for_machine(&machine)?
            }
        };
        info!("Raspberry Pi peripheral base 0x{:08X}", peripheral_base);
        Ok(RaspberryPi {
            config,
            peripheral_base,
        })
    }

    pub fn peripheral_base(&self) -> u64 {
        self.peripheral_base
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            gpio_count: consts::gpio::ADDRESSABLE_PINS,
            pin_set_width: consts::gpio::BANK0_PINS,
            pwm_channels: consts::pwm::CHANNEL_COUNT,
            i2c_buses: self.config.i2c_buses.clone().collect(),
        }
    }

    /// Maps the GPIO block.
    pub fn gpio(&self) -> Result<GpioController> {
        GpioController::open_from(&self.config.gpio_devices, self.peripheral_base)
    }

    /// Maps the clock manager and PWM blocks (needs `/dev/mem`).
    pub fn pwm(&self) -> Result<PwmController> {
        PwmController::open_from(&self.config.secure_devices, self.peripheral_base)
    }

    /// One of the header I2C buses; opened on its first transfer.
    pub fn i2c_bus(&self, bus_id: u8) -> Result<I2cBus> {
        if !self.config.i2c_buses.contains(&bus_id) {
            return Err(Error::InvalidArgument(format!(
                "I2C bus {} not available (buses {}-{})",
                bus_id,
                self.config.i2c_buses.start(),
                self.config.i2c_buses.end()
            )));
        }
        Ok(I2cBus::new(bus_id))
    }
}
