//! Bit layouts of the GPIO, clock manager and PWM registers.
//!
//! Everything here is a pure value type over one `u32`. Reading or writing
//! the hardware is the controllers' job; these types only describe where the
//! fields live and convert between hardware encodings and the domain enums
//! in [`crate::gpio`] and [`crate::pwm`].

use crate::consts;
use crate::error::{Error, Result};
use crate::gpio::{GpioMode, GpioPull};
use bitflags::bitflags;

/// Extracts `width` bits at `offset`.
#[inline]
pub(crate) fn get_field(word: u32, offset: u32, width: u32) -> u32 {
    let mask = (1u32 << width) - 1;
    (word >> offset) & mask
}

/// Replaces `width` bits at `offset`, leaving every other bit untouched.
#[inline]
pub(crate) fn set_field(word: u32, offset: u32, width: u32, value: u32) -> u32 {
    let mask = ((1u32 << width) - 1) << offset;
    (word & !mask) | ((value << offset) & mask)
}

// --- GPIO Function Select ---

/// One GPFSELn word: ten 3-bit function fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionSelect(u32);

impl FunctionSelect {
    pub const FIELDS: usize = 10;
    const WIDTH: u32 = 3;

    pub fn from_raw(raw: u32) -> Self {
        FunctionSelect(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Function of field `index` (0-9).
    pub fn get(&self, index: usize) -> Result<GpioMode> {
        let offset = Self::offset(index)?;
        Ok(GpioMode::from_function_bits(get_field(
            self.0,
            offset,
            Self::WIDTH,
        )))
    }

    /// Sets field `index` (0-9) without disturbing the other nine.
    pub fn set(&mut self, index: usize, mode: GpioMode) -> Result<()> {
        let offset = Self::offset(index)?;
        self.0 = set_field(self.0, offset, Self::WIDTH, mode.function_bits());
        Ok(())
    }

    fn offset(index: usize) -> Result<u32> {
        if index < Self::FIELDS {
            Ok(index as u32 * Self::WIDTH)
        } else {
            Err(Error::InvalidArgument(format!(
                "function-select field {} out of range (0-9)",
                index
            )))
        }
    }
}

impl GpioMode {
    /// Hardware encoding of the mode in a function-select field.
    pub fn function_bits(self) -> u32 {
        match self {
            GpioMode::Input => 0b000,
            GpioMode::Output => 0b001,
            GpioMode::Alt0 => 0b100,
            GpioMode::Alt1 => 0b101,
            GpioMode::Alt2 => 0b110,
            GpioMode::Alt3 => 0b111,
            GpioMode::Alt4 => 0b011,
            GpioMode::Alt5 => 0b010,
        }
    }

    /// Decodes a 3-bit field; all eight values are meaningful.
    pub fn from_function_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => GpioMode::Input,
            0b001 => GpioMode::Output,
            0b100 => GpioMode::Alt0,
            0b101 => GpioMode::Alt1,
            0b110 => GpioMode::Alt2,
            0b111 => GpioMode::Alt3,
            0b011 => GpioMode::Alt4,
            _ => GpioMode::Alt5,
        }
    }
}

// --- GPIO Pull-up/down Control ---

/// Value written to GPPUD: the pull state the next GPPUDCLK0 write latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullControl(u32);

impl PullControl {
    pub const DISABLED: PullControl = PullControl(0b00);
    pub const PULL_DOWN: PullControl = PullControl(0b01);
    pub const PULL_UP: PullControl = PullControl(0b10);

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<GpioPull> for PullControl {
    fn from(pull: GpioPull) -> Self {
        match pull {
            GpioPull::None => PullControl::DISABLED,
            GpioPull::Down => PullControl::PULL_DOWN,
            GpioPull::Up => PullControl::PULL_UP,
        }
    }
}

// --- Clock Manager ---

/// CM_xxxDIV: password | DIVI (bits 12-23) | DIVF (bits 0-11).
///
/// Every field write re-asserts the password, so a divisor built from a
/// zeroed word is still a valid register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivisor(u32);

impl ClockDivisor {
    const DIVI_OFFSET: u32 = 12;
    const DIVF_OFFSET: u32 = 0;
    const WIDTH: u32 = 12;

    pub fn new(divi: u32, divf: u32) -> Result<Self> {
        let mut divisor = ClockDivisor(consts::clock::PASSWORD);
        divisor.set_divi(divi)?;
        divisor.set_divf(divf)?;
        Ok(divisor)
    }

    pub fn from_raw(raw: u32) -> Self {
        ClockDivisor(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn divi(&self) -> u32 {
        get_field(self.0, Self::DIVI_OFFSET, Self::WIDTH)
    }

    pub fn divf(&self) -> u32 {
        get_field(self.0, Self::DIVF_OFFSET, Self::WIDTH)
    }

    pub fn set_divi(&mut self, divi: u32) -> Result<()> {
        self.put("DIVI", Self::DIVI_OFFSET, divi)
    }

    pub fn set_divf(&mut self, divf: u32) -> Result<()> {
        self.put("DIVF", Self::DIVF_OFFSET, divf)
    }

    fn put(&mut self, name: &str, offset: u32, value: u32) -> Result<()> {
        if value > consts::clock::PRESCALE_MAX {
            return Err(Error::InvalidArgument(format!(
                "clock divisor {} value {} does not fit 12 bits",
                name, value
            )));
        }
        self.0 = set_field(self.0, offset, Self::WIDTH, value) | consts::clock::PASSWORD;
        Ok(())
    }
}

bitflags! {
    /// CM_xxxCTL option bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClockControl: u32 {
        const PASSWORD = consts::clock::PASSWORD;
        const BUSY = 1 << 7;
        const KILL = 1 << 5;
        const ENABLE = 1 << 4;

        const SOURCE_OSCILLATOR = 1;
        const SOURCE_PLLA = 4;
        const SOURCE_PLLC = 5;
        const SOURCE_PLLD = 6;
        const SOURCE_HDMI = 7;
    }
}

impl ClockControl {
    const SOURCE_MASK: u32 = 0b111;

    /// Clock source selected by bits 0-2, if it is one with a name.
    pub fn source(self) -> Option<ClockSource> {
        ClockSource::from_bits(self.bits() & Self::SOURCE_MASK)
    }

    /// Replaces the source selector.
    pub fn with_source(self, source: ClockSource) -> Self {
        Self::from_bits_retain((self.bits() & !Self::SOURCE_MASK) | source.bits())
    }

    /// The word to store: top byte forced to the password.
    pub fn with_password(self) -> Self {
        Self::from_bits_retain(
            (self.bits() & !consts::clock::PASSWORD_MASK) | consts::clock::PASSWORD,
        )
    }
}

/// Clock sources the clock manager can divide down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// 19.2 MHz crystal.
    Oscillator,
    PllA,
    PllC,
    /// 500 MHz.
    PllD,
    HdmiAux,
}

impl ClockSource {
    pub fn bits(self) -> u32 {
        match self {
            ClockSource::Oscillator => 1,
            ClockSource::PllA => 4,
            ClockSource::PllC => 5,
            ClockSource::PllD => 6,
            ClockSource::HdmiAux => 7,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(ClockSource::Oscillator),
            4 => Some(ClockSource::PllA),
            5 => Some(ClockSource::PllC),
            6 => Some(ClockSource::PllD),
            7 => Some(ClockSource::HdmiAux),
            _ => None,
        }
    }
}

impl From<ClockSource> for ClockControl {
    fn from(source: ClockSource) -> Self {
        ClockControl::from_bits_retain(source.bits())
    }
}

// --- PWM ---

bitflags! {
    /// PWM CTL word. Channel 1 owns bits 0-7, channel 2 mirrors them at 8-15;
    /// CLRF is shared.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PwmControl: u32 {
        const PWEN1 = 1 << 0;
        const MODE1 = 1 << 1;
        const RPTL1 = 1 << 2;
        const SBIT1 = 1 << 3;
        const POLA1 = 1 << 4;
        const USEF1 = 1 << 5;
        const CLRF = 1 << 6;
        const MSEN1 = 1 << 7;

        const PWEN2 = 1 << 8;
        const MODE2 = 1 << 9;
        const RPTL2 = 1 << 10;
        const SBIT2 = 1 << 11;
        const POLA2 = 1 << 12;
        const USEF2 = 1 << 13;
        const MSEN2 = 1 << 15;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_select_layout() {
        let mut fsel = FunctionSelect::from_raw(0);
        fsel.set(0, GpioMode::Output).unwrap();
        fsel.set(9, GpioMode::Alt3).unwrap();
        assert_eq!(fsel.raw(), 0b0011_1000_0000_0000_0000_0000_0000_0001);
        assert_eq!(fsel.get(0).unwrap(), GpioMode::Output);
        assert_eq!(fsel.get(9).unwrap(), GpioMode::Alt3);
    }

    #[test]
    fn test_function_select_round_trip_leaves_neighbours() {
        let modes = [
            GpioMode::Input,
            GpioMode::Output,
            GpioMode::Alt0,
            GpioMode::Alt1,
            GpioMode::Alt2,
            GpioMode::Alt3,
            GpioMode::Alt4,
            GpioMode::Alt5,
        ];
        for index in 0..FunctionSelect::FIELDS {
            for &mode in &modes {
                // Start from a busy word so a sloppy mask would show
                let mut fsel = FunctionSelect::from_raw(0x2AAA_AAAA);
                let before: Vec<_> = (0..10).map(|i| fsel.get(i).unwrap()).collect();
                fsel.set(index, mode).unwrap();
                for other in 0..FunctionSelect::FIELDS {
                    let expected = if other == index { mode } else { before[other] };
                    assert_eq!(fsel.get(other).unwrap(), expected, "field {other}");
                }
                assert_eq!(fsel.raw() & 0xC000_0000, 0, "bits 30-31 must stay clear");
            }
        }
    }

    #[test]
    fn test_function_select_rejects_field_10() {
        let mut fsel = FunctionSelect::default();
        assert!(matches!(fsel.get(10), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            fsel.set(10, GpioMode::Output),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(fsel.raw(), 0);
    }

    #[test]
    fn test_function_bits_encoding() {
        assert_eq!(GpioMode::Alt5.function_bits(), 0b010);
        assert_eq!(GpioMode::Alt4.function_bits(), 0b011);
        assert_eq!(GpioMode::Alt0.function_bits(), 0b100);
        for bits in 0..8 {
            assert_eq!(GpioMode::from_function_bits(bits).function_bits(), bits);
        }
    }

    #[test]
    fn test_pull_control_values() {
        assert_eq!(PullControl::from(GpioPull::Up).raw(), 0b10);
        assert_eq!(PullControl::from(GpioPull::Down).raw(), 0b01);
        assert_eq!(PullControl::from(GpioPull::None).raw(), 0);
    }

    #[test]
    fn test_clock_control_layout() {
        let ctl = ClockControl::PASSWORD | ClockControl::SOURCE_PLLD | ClockControl::ENABLE;
        assert_eq!(ctl.bits(), 0x5A00_0016);
        assert_eq!(ctl.source(), Some(ClockSource::PllD));

        // Hardware reads the password back as zero
        let readback = ClockControl::from_bits_retain(0x0000_0096);
        assert_eq!(readback.source(), Some(ClockSource::PllD));
        assert!(readback.contains(ClockControl::BUSY));
        assert_eq!(readback.with_password().bits() >> 24, 0x5A);
        assert_eq!(ClockControl::from_bits_retain(0xFF00_0010).with_password().bits(), 0x5A00_0010);
    }

    #[test]
    fn test_clock_control_source_swap() {
        let ctl = (ClockControl::ENABLE | ClockControl::SOURCE_PLLD).with_source(ClockSource::Oscillator);
        assert_eq!(ctl.bits(), 0x11);
        assert_eq!(ctl.source(), Some(ClockSource::Oscillator));
        assert_eq!(ClockControl::from_bits_retain(0b011).source(), None);
        assert_eq!(ClockControl::from(ClockSource::HdmiAux).bits(), 7);
    }

    #[test]
    fn test_clock_divisor_layout() {
        assert_eq!(ClockDivisor::new(2, 0).unwrap().raw(), 0x5A00_2000);
        let full = ClockDivisor::new(0x123, 0x123).unwrap();
        assert_eq!(full.raw(), 0x5A12_3123);
        assert_eq!(full.divi(), 0x123);
        assert_eq!(full.divf(), 0x123);

        let mut zeroed = ClockDivisor::from_raw(0);
        zeroed.set_divi(2).unwrap();
        assert_eq!(zeroed.raw(), 0x5A00_2000);
    }

    #[test]
    fn test_clock_divisor_rejects_overflow() {
        assert!(matches!(
            ClockDivisor::new(0x1000, 0),
            Err(Error::InvalidArgument(_))
        ));
        let mut divisor = ClockDivisor::new(2, 0).unwrap();
        assert!(divisor.set_divf(0x1000).is_err());
        assert_eq!(divisor.raw(), 0x5A00_2000);
    }

    #[test]
    fn test_pwm_control_channel_groups_are_disjoint() {
        let ch1 = PwmControl::PWEN1 | PwmControl::MODE1 | PwmControl::RPTL1 | PwmControl::SBIT1
            | PwmControl::POLA1 | PwmControl::USEF1 | PwmControl::MSEN1;
        let ch2 = PwmControl::PWEN2 | PwmControl::MODE2 | PwmControl::RPTL2 | PwmControl::SBIT2
            | PwmControl::POLA2 | PwmControl::USEF2 | PwmControl::MSEN2;
        assert!(ch1.intersection(ch2).is_empty());
        assert_eq!(ch1.bits() & !0xFF, 0);
        assert_eq!(ch2.bits() & !0xFF00, 0);
        assert_eq!(PwmControl::MSEN2.bits(), 0x8000);
        assert_eq!(PwmControl::CLRF.bits(), 0x40);
    }

    #[test]
    fn test_field_helpers() {
        assert_eq!(set_field(0xFFFF_FFFF, 4, 4, 0), 0xFFFF_FF0F);
        assert_eq!(set_field(0, 28, 4, 0x1F), 0xF000_0000);
        assert_eq!(get_field(0x5A12_3123, 12, 12), 0x123);
    }
}
