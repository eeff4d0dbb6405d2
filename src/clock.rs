//! Clock manager control and prescaler arithmetic.

use crate::consts;
use crate::delay::Delay;
use crate::error::{Error, Result};
use crate::mmap::RegisterWindow;
use crate::registers::{ClockControl, ClockDivisor, ClockSource};
use log::debug;

/// The PWM clock generator inside the clock manager block.
#[derive(Debug)]
pub struct ClockManager<W: RegisterWindow> {
    window: W,
}

impl<W: RegisterWindow> ClockManager<W> {
    pub fn new(window: W) -> Self {
        ClockManager { window }
    }

    /// Current CM_PWMCTL contents.
    pub fn control(&self) -> ClockControl {
        ClockControl::from_bits_retain(self.window.read_word(consts::clock::REG_PWM_CTL))
    }

    /// Current CM_PWMDIV contents.
    pub fn divisor(&self) -> ClockDivisor {
        ClockDivisor::from_raw(self.window.read_word(consts::clock::REG_PWM_DIV))
    }

    /// Stops the generator and waits for it to settle.
    pub fn kill<D: Delay>(&mut self, delay: &mut D) {
        debug!("Killing PWM clock");
        let ctl = (ClockControl::PASSWORD | ClockControl::KILL).with_password();
        self.window.write_word(consts::clock::REG_PWM_CTL, ctl.bits());
        delay.delay_us(consts::clock::SETTLE_US);
    }

    /// Kills the generator, programs the divisor and restarts it from `source`.
    pub fn start<D: Delay>(&mut self, divisor: ClockDivisor, source: ClockSource, delay: &mut D) {
        self.kill(delay);
        debug!(
            "Starting PWM clock: source {:?}, DIVI {}, DIVF {}",
            source,
            divisor.divi(),
            divisor.divf()
        );
        self.window
            .write_word(consts::clock::REG_PWM_DIV, divisor.raw());
        let ctl = (ClockControl::ENABLE | ClockControl::from(source)).with_password();
        self.window.write_word(consts::clock::REG_PWM_CTL, ctl.bits());
        delay.delay_us(consts::clock::SETTLE_US);
    }
}

/// Prescaler for a 12-bit counter clocked from `oscillator_hz` to tick
/// through one full cycle `hz` times a second.
///
/// `round(oscillator_hz / 4096 / hz) - 1`. A frequency of zero, or one
/// whose prescaler falls outside the 12-bit field, is rejected rather than
/// truncated.
pub fn prescale_for_frequency(oscillator_hz: u32, hz: f64) -> Result<u16> {
    if !(hz.is_finite() && hz > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "frequency {} Hz must be positive",
            hz
        )));
    }
    let prescale =
        (oscillator_hz as f64 / consts::clock::PRESCALE_STEPS as f64 / hz).round() - 1.0;
    if !(0.0..=consts::clock::PRESCALE_MAX as f64).contains(&prescale) {
        return Err(Error::InvalidArgument(format!(
            "frequency {} Hz needs prescale {}, outside 0-{}",
            hz,
            prescale,
            consts::clock::PRESCALE_MAX
        )));
    }
    Ok(prescale as u16)
}

/// Frequency a given prescaler actually produces.
pub fn frequency_for_prescale(oscillator_hz: u32, prescale: u16) -> f64 {
    oscillator_hz as f64 / consts::clock::PRESCALE_STEPS as f64 / (prescale as f64 + 1.0)
}
