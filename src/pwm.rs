//! Hardware PWM through the SoC PWM block and its clock generator.

use crate::clock::ClockManager;
use crate::consts;
use crate::delay::{Delay, ThreadDelay};
use crate::error::{invalid_pwm_channel, Error, Result};
use crate::gpio::{GpioController, GpioMode, GpioPin, PinSet};
use crate::mmap::{map_window, MappedWindow, RegisterWindow};
use crate::registers::{ClockDivisor, ClockSource, PwmControl};
use log::{debug, trace, warn};
use std::fmt;
use std::path::Path;

/// The two PWM channels of the SoC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmChannel {
    /// Channel 1 in the datasheet; routable to GPIO12 and GPIO18.
    Pwm0,
    /// Channel 2 in the datasheet; routable to GPIO13 and GPIO19.
    Pwm1,
}

impl PwmChannel {
    /// Channel by zero-based index.
    pub fn from_index(index: usize) -> Result<Self> {
        match index {
            0 => Ok(PwmChannel::Pwm0),
            1 => Ok(PwmChannel::Pwm1),
            _ => Err(invalid_pwm_channel(index, consts::pwm::CHANNEL_COUNT)),
        }
    }

    pub fn index(self) -> usize {
        match self {
            PwmChannel::Pwm0 => 0,
            PwmChannel::Pwm1 => 1,
        }
    }

    /// The enable and mark-space bits this channel owns in CTL.
    pub fn control_bits(self) -> PwmControl {
        match self {
            PwmChannel::Pwm0 => PwmControl::PWEN1 | PwmControl::MSEN1,
            PwmChannel::Pwm1 => PwmControl::PWEN2 | PwmControl::MSEN2,
        }
    }

    /// Header pins this channel can drive.
    pub fn pins(self) -> PinSet {
        match self {
            PwmChannel::Pwm0 => PinSet::from_raw((1 << 12) | (1 << 18)),
            PwmChannel::Pwm1 => PinSet::from_raw((1 << 13) | (1 << 19)),
        }
    }

    fn registers(self) -> (usize, usize) {
        match self {
            PwmChannel::Pwm0 => (consts::pwm::REG_RNG1, consts::pwm::REG_DAT1),
            PwmChannel::Pwm1 => (consts::pwm::REG_RNG2, consts::pwm::REG_DAT2),
        }
    }

    /// Channel and alternate function that route PWM to `pin`, if any.
    pub fn for_pin(pin: GpioPin) -> Option<(PwmChannel, GpioMode)> {
        match pin.number() {
            12 => Some((PwmChannel::Pwm0, GpioMode::Alt0)),
            13 => Some((PwmChannel::Pwm1, GpioMode::Alt0)),
            18 => Some((PwmChannel::Pwm0, GpioMode::Alt5)),
            19 => Some((PwmChannel::Pwm1, GpioMode::Alt5)),
            _ => None,
        }
    }
}

/// Range register value for a period: one count per 4 ns tick, at least 1.
pub fn pwm_range(period_ns: u64) -> Result<u32> {
    let ticks = (period_ns as f64 / consts::pwm::TICK_NS).round().max(1.0);
    if ticks > u32::MAX as f64 {
        return Err(Error::InvalidArgument(format!(
            "PWM period {} ns does not fit the range register",
            period_ns
        )));
    }
    Ok(ticks as u32)
}

/// Data register value for a duty cycle in percent, never above `range`.
pub fn pwm_data(duty_percent: f64, range: u32) -> Result<u32> {
    if duty_percent.is_nan() || duty_percent < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "PWM duty cycle {} must be a non-negative percentage",
            duty_percent
        )));
    }
    let data = (duty_percent * range as f64 / 100.0).round();
    Ok(data.min(range as f64) as u32)
}

/// Controller for both PWM channels and the clock that feeds them.
///
/// The clock is started once, on the first [`enable`](Self::enable) (or
/// [`start`](Self::start)), and runs at 250 MHz until disabled.
pub struct PwmController<W: RegisterWindow = MappedWindow, D: Delay = ThreadDelay> {
    clock: ClockManager<W>,
    window: W,
    delay: D,
    enabled: bool,
}

impl PwmController {
    /// Maps the clock and PWM blocks at `peripheral_base` through `/dev/mem`.
    pub fn open(peripheral_base: u64) -> Result<Self> {
        Self::open_from(consts::clock::DEVICES, peripheral_base)
    }

    /// Maps both blocks through the given candidate device files.
    pub fn open_from<P: AsRef<Path>>(paths: &[P], peripheral_base: u64) -> Result<Self> {
        let clock = map_window(paths, peripheral_base + consts::clock::OFFSET)?;
        let pwm = map_window(paths, peripheral_base + consts::pwm::OFFSET)?;
        Ok(Self::new(clock, pwm))
    }
}

impl<W: RegisterWindow> PwmController<W, ThreadDelay> {
    /// Wraps already mapped clock manager and PWM windows.
    pub fn new(clock_window: W, pwm_window: W) -> Self {
        Self::with_delay(clock_window, pwm_window, ThreadDelay)
    }
}

impl<W: RegisterWindow, D: Delay> PwmController<W, D> {
    pub fn with_delay(clock_window: W, pwm_window: W, delay: D) -> Self {
        PwmController {
            clock: ClockManager::new(clock_window),
            window: pwm_window,
            delay,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current PWM CTL contents.
    pub fn control(&self) -> PwmControl {
        PwmControl::from_bits_retain(self.window.read_word(consts::pwm::REG_CTL))
    }

    /// Starts the PWM clock (PLLD / 2). Does nothing if already running.
    pub fn enable(&mut self) -> Result<()> {
        if self.enabled {
            trace!("PWM clock already enabled");
            return Ok(());
        }
        let divisor = ClockDivisor::new(consts::clock::PWM_CLOCK_DIVI, 0)?;
        self.clock.start(divisor, ClockSource::PllD, &mut self.delay);
        self.enabled = true;
        Ok(())
    }

    /// Stops the PWM clock. Channel settings are left in place.
    pub fn disable(&mut self) {
        self.clock.kill(&mut self.delay);
        self.enabled = false;
    }

    /// Outputs a mark-space signal of `period_ns` with `duty_percent` high.
    ///
    /// Range and data are written before the channel is switched on; the
    /// other channel's CTL bits are left as they are.
    pub fn start(&mut self, channel: PwmChannel, period_ns: u64, duty_percent: f64) -> Result<()> {
        let range = pwm_range(period_ns)?;
        let data = pwm_data(duty_percent, range)?;
        self.enable()?;

        debug!(
            "Starting {:?}: period {} ns (range {}), duty {}% (data {})",
            channel, period_ns, range, duty_percent, data
        );
        let (reg_range, reg_data) = channel.registers();
        self.window.write_word(reg_range, range);
        self.window.write_word(reg_data, data);
        let ctl = self.control() | channel.control_bits();
        self.window.write_word(consts::pwm::REG_CTL, ctl.bits());
        Ok(())
    }

    /// Switches one channel off, leaving the other running.
    pub fn stop(&mut self, channel: PwmChannel) {
        debug!("Stopping {:?}", channel);
        let ctl = self.control() - channel.control_bits();
        self.window.write_word(consts::pwm::REG_CTL, ctl.bits());
    }

    /// Routes `pin` to the PWM channel that can drive it and returns that channel.
    ///
    /// Only GPIO12, 13, 18 and 19 carry PWM.
    pub fn enable_pin<GW: RegisterWindow, GD: Delay>(
        &mut self,
        gpio: &mut GpioController<GW, GD>,
        pin: GpioPin,
    ) -> Result<PwmChannel> {
        let (channel, mode) = PwmChannel::for_pin(pin).ok_or_else(|| {
            warn!("{} has no PWM function", pin);
            Error::InvalidArgument(format!(
                "{} cannot carry PWM (use GPIO12, 13, 18 or 19)",
                pin
            ))
        })?;
        debug!("Routing {:?} to {} ({:?})", channel, pin, mode);
        gpio.set_mode(pin, mode)?;
        Ok(channel)
    }
}

impl<W: RegisterWindow, D: Delay> fmt::Debug for PwmController<W, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PwmController")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
