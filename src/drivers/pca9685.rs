//! PCA9685 16-channel, 12-bit PWM expander.

use crate::clock::{frequency_for_prescale, prescale_for_frequency};
use crate::consts;
use crate::delay::{Delay, ThreadDelay};
use crate::error::{Error, Result};
use crate::i2c::{I2cAddress, I2cBus, I2cEndpoint, I2cTransport, LinuxI2c};
use bitflags::bitflags;
use log::debug;

/// Address of the common breakout boards with no address jumpers set.
pub const DEFAULT_ADDRESS: u8 = 0x40;
pub const CHANNEL_COUNT: u8 = 16;
/// Bit 12 of an ON or OFF step: output fully on or fully off.
pub const FULL_STEP: u16 = 0x1000;

const OSCILLATOR_HZ: u32 = consts::clock::PRESCALE_OSCILLATOR_HZ;
const OSCILLATOR_SETTLE_US: u64 = 5;
// The chip forces any prescale below 3 up to 3
const PRESCALE_MIN: u16 = 3;
const PRESCALE_MAX: u16 = 0xFF;

// Registers
const REG_MODE1: u8 = 0x00;
const REG_MODE2: u8 = 0x01;
const REG_LED0_ON: u8 = 0x06;
const REG_LED0_OFF: u8 = 0x08;
const REG_ALL_LED_ON: u8 = 0xFA;
const REG_ALL_LED_OFF: u8 = 0xFC;
const REG_PRESCALE: u8 = 0xFE;
const LED_STRIDE: u8 = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode1: u8 {
        const ALLCALL = 0x01;
        const SLEEP = 0x10;
        const AI = 0x20;
        const RESTART = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode2: u8 {
        const OUTDRV = 0x04;
        const INVRT = 0x10;
    }
}

/// A PCA9685 on an I2C bus.
///
/// Construction resets all outputs to off and wakes the oscillator with
/// register auto-increment on, which the word writes rely on.
pub struct Pca9685<'a, T: I2cTransport = LinuxI2c, D: Delay = ThreadDelay> {
    endpoint: I2cEndpoint<'a, T>,
    delay: D,
    frequency: Option<f64>,
    prescale: Option<u16>,
}

impl<'a, T: I2cTransport> Pca9685<'a, T, ThreadDelay> {
    pub fn new(bus: &'a mut I2cBus<T>, address: u8) -> Result<Self> {
        Self::with_delay(bus, address, ThreadDelay)
    }
}

impl<'a, T: I2cTransport, D: Delay> Pca9685<'a, T, D> {
    pub fn with_delay(bus: &'a mut I2cBus<T>, address: u8, delay: D) -> Result<Self> {
        let mut endpoint = bus.endpoint(address)?;
        endpoint.probe()?;
        let mut pca = Pca9685 {
            endpoint,
            delay,
            frequency: None,
            prescale: None,
        };
        pca.init()?;
        Ok(pca)
    }

    fn init(&mut self) -> Result<()> {
        debug!("PCA9685 {}: initialising", self.address());
        self.set_all_channels(0, 0)?;
        self.endpoint.write_byte(REG_MODE2, Mode2::OUTDRV.bits())?;
        self.endpoint.write_byte(REG_MODE1, Mode1::ALLCALL.bits())?;
        self.delay.delay_us(OSCILLATOR_SETTLE_US);

        let mode1 = self.mode1()?;
        let awake = (mode1 - Mode1::SLEEP) | Mode1::AI;
        self.endpoint.write_byte(REG_MODE1, awake.bits())?;
        self.delay.delay_us(OSCILLATOR_SETTLE_US);
        Ok(())
    }

    pub fn address(&self) -> I2cAddress {
        self.endpoint.address()
    }

    pub fn mode1(&mut self) -> Result<Mode1> {
        Ok(Mode1::from_bits_retain(self.endpoint.read_byte(REG_MODE1)?))
    }

    /// Sets the PWM frequency of all channels.
    ///
    /// The prescaler can only be written while the oscillator sleeps, so the
    /// chip is put to sleep, reprogrammed, and restarted with its previous
    /// MODE1 settings.
    pub fn set_frequency(&mut self, hz: f64) -> Result<()> {
        let prescale = prescale_for_frequency(OSCILLATOR_HZ, hz)?;
        if !(PRESCALE_MIN..=PRESCALE_MAX).contains(&prescale) {
            return Err(Error::InvalidArgument(format!(
                "PCA9685 cannot run at {} Hz (prescale {} outside {}-{})",
                hz, prescale, PRESCALE_MIN, PRESCALE_MAX
            )));
        }
        debug!(
            "PCA9685 {}: frequency {} Hz (prescale {})",
            self.address(),
            hz,
            prescale
        );

        let mode1 = self.mode1()?;
        let sleeping = (mode1 - Mode1::RESTART) | Mode1::SLEEP;
        self.endpoint.write_byte(REG_MODE1, sleeping.bits())?;
        self.endpoint.write_byte(REG_PRESCALE, prescale as u8)?;
        self.endpoint.write_byte(REG_MODE1, mode1.bits())?;
        self.delay.delay_us(OSCILLATOR_SETTLE_US);
        self.endpoint
            .write_byte(REG_MODE1, (mode1 | Mode1::RESTART).bits())?;

        self.frequency = Some(hz);
        self.prescale = Some(prescale);
        Ok(())
    }

    /// Frequency last requested with [`set_frequency`](Self::set_frequency).
    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    /// Frequency the programmed prescaler really produces.
    pub fn actual_frequency(&self) -> Option<f64> {
        self.prescale
            .map(|prescale| frequency_for_prescale(OSCILLATOR_HZ, prescale))
    }

    /// Sets the step (0-4095) at which one channel turns on and off.
    ///
    /// Setting [`FULL_STEP`] in `on` or `off` holds the output fully on or off.
    pub fn set_channel(&mut self, channel: u8, on: u16, off: u16) -> Result<()> {
        if channel >= CHANNEL_COUNT {
            return Err(Error::InvalidArgument(format!(
                "PCA9685 channel {} out of range (0-{})",
                channel,
                CHANNEL_COUNT - 1
            )));
        }
        check_steps(on, off)?;
        let offset = LED_STRIDE * channel;
        self.endpoint.write_word(REG_LED0_ON + offset, on)?;
        self.endpoint.write_word(REG_LED0_OFF + offset, off)
    }

    /// Sets the same on and off steps for every channel.
    pub fn set_all_channels(&mut self, on: u16, off: u16) -> Result<()> {
        check_steps(on, off)?;
        self.endpoint.write_word(REG_ALL_LED_ON, on)?;
        self.endpoint.write_word(REG_ALL_LED_OFF, off)
    }
}

fn check_steps(on: u16, off: u16) -> Result<()> {
    let max = FULL_STEP | (FULL_STEP - 1);
    if on > max || off > max {
        return Err(Error::InvalidArgument(format!(
            "PCA9685 steps on={} off={} exceed 0x{:04X}",
            on, off, max
        )));
    }
    Ok(())
}
