//! GPIO pin configuration, output and input through the memory-mapped GPIO block.

use crate::consts;
use crate::delay::{Delay, ThreadDelay};
use crate::error::{invalid_pin, Result};
use crate::mmap::{map_window, MappedWindow, RegisterWindow};
use crate::registers::{FunctionSelect, PullControl};
use log::{debug, trace};
use std::fmt;
use std::path::Path;

/// Pin function as selected in GPFSELn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioMode {
    Input,
    Output,
    Alt0,
    Alt1,
    Alt2,
    Alt3,
    Alt4,
    Alt5,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioLevel {
    Low,
    High,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioPull {
    None,
    Up,
    Down,
}

/// Represents a valid GPIO Pin number (0-31).
/// Use `GpioPin::new(num)` to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpioPin(u8);

impl GpioPin {
    /// Creates a new GpioPin, returning an error if the number is out of range (0-31).
    pub fn new(pin_num: u8) -> Result<Self> {
        if pin_num < consts::gpio::BANK0_PINS {
            Ok(GpioPin(pin_num))
        } else {
            Err(invalid_pin(pin_num))
        }
    }

    /// Returns the underlying pin number (0-31).
    #[inline]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Returns which GPFSELn word holds this pin's function field.
    #[inline]
    pub fn function_offset(&self) -> usize {
        self.0 as usize / FunctionSelect::FIELDS
    }

    /// Returns the field index (0-9) inside that word.
    #[inline]
    pub fn function_index(&self) -> usize {
        self.0 as usize % FunctionSelect::FIELDS
    }

    /// Returns the bit mask (1 << number) for the set/clear/level registers.
    #[inline]
    pub fn mask(&self) -> u32 {
        1u32 << self.0
    }
}

impl fmt::Display for GpioPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// A set of pins in bank 0, bit i = pin i.
///
/// Only built from validated [`GpioPin`]s or raw masks, and changed only
/// through set operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PinSet(u32);

impl PinSet {
    pub const fn empty() -> Self {
        PinSet(0)
    }

    pub const fn from_raw(mask: u32) -> Self {
        PinSet(mask)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub fn insert(&mut self, pin: GpioPin) {
        self.0 |= pin.mask();
    }

    pub fn union(self, other: PinSet) -> PinSet {
        PinSet(self.0 | other.0)
    }

    pub fn subtract(self, other: PinSet) -> PinSet {
        PinSet(self.0 & !other.0)
    }

    pub fn intersection(self, other: PinSet) -> PinSet {
        PinSet(self.0 & other.0)
    }

    /// True if every pin of `other` is in this set.
    pub fn contains(&self, other: PinSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn contains_pin(&self, pin: GpioPin) -> bool {
        self.0 & pin.mask() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Pins in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = GpioPin> + '_ {
        (0..consts::gpio::BANK0_PINS)
            .filter(move |n| self.0 & (1 << n) != 0)
            .map(GpioPin)
    }
}

impl From<GpioPin> for PinSet {
    fn from(pin: GpioPin) -> Self {
        PinSet(pin.mask())
    }
}

impl FromIterator<GpioPin> for PinSet {
    fn from_iter<I: IntoIterator<Item = GpioPin>>(iter: I) -> Self {
        let mut set = PinSet::empty();
        for pin in iter {
            set.insert(pin);
        }
        set
    }
}

/// Controller for the GPIO register block.
///
/// Generic over the register window so the same code drives a real mapping
/// or a [`MemoryWindow`](crate::mmap::MemoryWindow), and over the delay used
/// by the pull-up latch sequence.
pub struct GpioController<W: RegisterWindow = MappedWindow, D: Delay = ThreadDelay> {
    window: W,
    delay: D,
}

impl GpioController {
    /// Maps the GPIO block at `peripheral_base` through the default device files.
    pub fn open(peripheral_base: u64) -> Result<Self> {
        Self::open_from(consts::gpio::DEVICES, peripheral_base)
    }

    /// Maps the GPIO block through the given candidate device files.
    pub fn open_from<P: AsRef<Path>>(paths: &[P], peripheral_base: u64) -> Result<Self> {
        let window = map_window(paths, peripheral_base + consts::gpio::OFFSET)?;
        Ok(Self::new(window))
    }
}

impl<W: RegisterWindow> GpioController<W, ThreadDelay> {
    /// Wraps an already mapped window.
    pub fn new(window: W) -> Self {
        Self::with_delay(window, ThreadDelay)
    }
}

impl<W: RegisterWindow, D: Delay> GpioController<W, D> {
    /// Wraps a window with a custom settle delay.
    pub fn with_delay(window: W, delay: D) -> Self {
        GpioController { window, delay }
    }

    /// Underlying register window.
    pub fn window(&self) -> &W {
        &self.window
    }

    // --- Function Select ---

    /// Sets the function of a single pin. Other pins in the same word are preserved.
    pub fn set_mode(&mut self, pin: GpioPin, mode: GpioMode) -> Result<()> {
        let reg = consts::gpio::REG_FSEL0 + pin.function_offset();
        let mut fsel = FunctionSelect::from_raw(self.window.read_word(reg));
        fsel.set(pin.function_index(), mode)?;
        debug!("Setting {} mode: {:?}", pin, mode);
        self.window.write_word(reg, fsel.raw());
        Ok(())
    }

    /// Sets the same function on every pin of the set.
    pub fn set_mode_pins(&mut self, pins: PinSet, mode: GpioMode) -> Result<()> {
        for pin in pins.iter() {
            self.set_mode(pin, mode)?;
        }
        Ok(())
    }

    /// Reads back the function of a single pin.
    pub fn get_mode(&self, pin: GpioPin) -> Result<GpioMode> {
        let reg = consts::gpio::REG_FSEL0 + pin.function_offset();
        FunctionSelect::from_raw(self.window.read_word(reg)).get(pin.function_index())
    }

    // --- Levels ---

    /// Drives every pin of the set high (GPSET0) or low (GPCLR0).
    ///
    /// Pins not in the set are unaffected; the hardware ignores zero bits.
    pub fn set_level(&mut self, pins: PinSet, level: GpioLevel) {
        let reg = match level {
            GpioLevel::High => consts::gpio::REG_SET0,
            GpioLevel::Low => consts::gpio::REG_CLR0,
        };
        trace!("Setting pins 0x{:08X} {:?}", pins.raw(), level);
        self.window.write_word(reg, pins.raw());
    }

    /// High only if every pin in the set currently reads high.
    ///
    /// An empty set reads as high.
    pub fn get_level(&self, pins: PinSet) -> GpioLevel {
        let levels = PinSet::from_raw(self.window.read_word(consts::gpio::REG_LEV0));
        trace!(
            "Read GPLEV0 = 0x{:08X} for pins 0x{:08X}",
            levels.raw(),
            pins.raw()
        );
        if levels.contains(pins) {
            GpioLevel::High
        } else {
            GpioLevel::Low
        }
    }

    // --- Pull-up/down ---

    /// Latches the pull resistor state into every pin of the set.
    ///
    /// GPPUD is written first, then clocked into the pins through
    /// GPPUDCLK0, then both are cleared again, with a settle delay after
    /// each of the first three writes.
    pub fn set_pullup(&mut self, pins: PinSet, pull: GpioPull) {
        let settle = consts::gpio::PULL_SETTLE_US;
        debug!("Setting pull on pins 0x{:08X}: {:?}", pins.raw(), pull);
        self.window
            .write_word(consts::gpio::REG_PUD, PullControl::from(pull).raw());
        self.delay.delay_us(settle);
        self.window.write_word(consts::gpio::REG_PUDCLK0, pins.raw());
        self.delay.delay_us(settle);
        self.window
            .write_word(consts::gpio::REG_PUD, PullControl::DISABLED.raw());
        self.delay.delay_us(settle);
        self.window.write_word(consts::gpio::REG_PUDCLK0, 0);
    }
}

impl<W: RegisterWindow + fmt::Debug, D: Delay> fmt::Debug for GpioController<W, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioController")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
