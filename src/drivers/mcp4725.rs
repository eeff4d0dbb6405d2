//! MCP4725 12-bit DAC with EEPROM.

use crate::codec::{I2cReadable, I2cWritable};
use crate::delay::{Delay, ThreadDelay};
use crate::error::{Error, Result};
use crate::i2c::{I2cAddress, I2cBus, I2cEndpoint, I2cTransport, LinuxI2c};
use log::{debug, warn};

/// Address with A0 tied low, as on most breakout boards.
pub const DEFAULT_ADDRESS: u8 = 0x62;
/// Address with A0 tied high.
pub const DEFAULT_HIGH_ADDRESS: u8 = 0x63;
/// Largest DAC code.
pub const MAX_CODE: u16 = 0x0FFF;

const READY_POLL_MS: u64 = 5;
const DEFAULT_READY_POLLS: u32 = 100;

/// Output state when the DAC is powered down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerDownMode {
    #[default]
    Normal,
    /// Output pulled to ground through 1 kΩ.
    PowerDown1k,
    PowerDown100k,
    PowerDown500k,
}

impl PowerDownMode {
    pub fn bits(self) -> u8 {
        match self {
            PowerDownMode::Normal => 0b00,
            PowerDownMode::PowerDown1k => 0b01,
            PowerDownMode::PowerDown100k => 0b10,
            PowerDownMode::PowerDown500k => 0b11,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => PowerDownMode::Normal,
            0b01 => PowerDownMode::PowerDown1k,
            0b10 => PowerDownMode::PowerDown100k,
            _ => PowerDownMode::PowerDown500k,
        }
    }
}

/// C2..C0 of a full write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCommand {
    WriteDac,
    WriteDacAndEeprom,
}

impl WriteCommand {
    pub fn bits(self) -> u8 {
        match self {
            WriteCommand::WriteDac => 0b010,
            WriteCommand::WriteDacAndEeprom => 0b011,
        }
    }
}

/// Fast-mode write: power-down bits and code in two bytes, DAC register only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastModeData {
    pub code: u16,
    pub mode: PowerDownMode,
}

impl I2cWritable for FastModeData {
    const DATA_LENGTH: usize = 2;

    fn to_bytes(&self) -> Vec<u8> {
        vec![
            (self.mode.bits() << 4) | ((self.code >> 8) as u8 & 0x0F),
            (self.code & 0xFF) as u8,
        ]
    }
}

/// Three-byte frame: written as a full command, read back as the status.
///
/// `ready` and `command` only mean something in one direction each; a
/// decoded frame reports [`WriteCommand::WriteDac`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullData {
    pub command: WriteCommand,
    pub code: u16,
    pub mode: PowerDownMode,
    pub ready: bool,
}

impl I2cReadable for FullData {
    const DATA_LENGTH: usize = 3;

    fn from_bytes(bytes: &[u8]) -> Self {
        FullData {
            command: WriteCommand::WriteDac,
            code: ((bytes[1] as u16) << 4) | (bytes[2] as u16 >> 4),
            mode: PowerDownMode::from_bits(bytes[0] >> 1),
            ready: bytes[0] & 0x80 != 0,
        }
    }
}

impl I2cWritable for FullData {
    const DATA_LENGTH: usize = 3;

    fn to_bytes(&self) -> Vec<u8> {
        vec![
            (self.command.bits() << 5) | (self.mode.bits() << 1),
            (self.code >> 4) as u8,
            ((self.code & 0x0F) << 4) as u8,
        ]
    }
}

/// An MCP4725 on an I2C bus.
pub struct Mcp4725<'a, T: I2cTransport = LinuxI2c, D: Delay = ThreadDelay> {
    endpoint: I2cEndpoint<'a, T>,
    delay: D,
    ready_polls: u32,
}

impl<'a, T: I2cTransport> Mcp4725<'a, T, ThreadDelay> {
    /// Attaches to the DAC at `address`, failing if nothing answers there.
    pub fn new(bus: &'a mut I2cBus<T>, address: u8) -> Result<Self> {
        Self::with_delay(bus, address, ThreadDelay)
    }
}

impl<'a, T: I2cTransport, D: Delay> Mcp4725<'a, T, D> {
    pub fn with_delay(bus: &'a mut I2cBus<T>, address: u8, delay: D) -> Result<Self> {
        let mut endpoint = bus.endpoint(address)?;
        endpoint.probe()?;
        debug!("MCP4725 attached at {}", endpoint.address());
        Ok(Mcp4725 {
            endpoint,
            delay,
            ready_polls: DEFAULT_READY_POLLS,
        })
    }

    /// Status reads allowed (5 ms apart) before an EEPROM write gives up.
    pub fn with_ready_polls(mut self, polls: u32) -> Self {
        self.ready_polls = polls.max(1);
        self
    }

    pub fn address(&self) -> I2cAddress {
        self.endpoint.address()
    }

    /// Sets the output immediately. Not kept across power cycles.
    pub fn set_voltage(&mut self, code: u16, mode: PowerDownMode) -> Result<()> {
        check_code(code)?;
        debug!("MCP4725 {}: output {} ({:?})", self.address(), code, mode);
        self.endpoint.encode(&FastModeData { code, mode })
    }

    /// Sets the output and stores it as the power-on value.
    ///
    /// Waits for any EEPROM write still in progress first.
    pub fn set_default_voltage(&mut self, code: u16, mode: PowerDownMode) -> Result<()> {
        check_code(code)?;
        self.wait_for_ready()?;
        debug!("MCP4725 {}: power-on output {} ({:?})", self.address(), code, mode);
        self.endpoint.encode(&FullData {
            command: WriteCommand::WriteDacAndEeprom,
            code,
            mode,
            ready: false,
        })
    }

    /// Current DAC code and power-down mode.
    pub fn read_voltage(&mut self) -> Result<(u16, PowerDownMode)> {
        let status = self.status()?;
        Ok((status.code, status.mode))
    }

    /// Raw status frame.
    pub fn status(&mut self) -> Result<FullData> {
        self.endpoint.decode::<FullData>()
    }

    /// Polls until the EEPROM is idle.
    pub fn wait_for_ready(&mut self) -> Result<()> {
        for attempt in 1..=self.ready_polls {
            if self.status()?.ready {
                return Ok(());
            }
            if attempt < self.ready_polls {
                self.delay.delay_ms(READY_POLL_MS);
            }
        }
        warn!(
            "MCP4725 {}: still busy after {} polls",
            self.address(),
            self.ready_polls
        );
        Err(Error::DeviceBusy {
            bus: self.endpoint.bus_id(),
            address: self.address(),
            attempts: self.ready_polls,
        })
    }
}

fn check_code(code: u16) -> Result<()> {
    if code > MAX_CODE {
        return Err(Error::InvalidArgument(format!(
            "DAC code {} out of range (0-{})",
            code, MAX_CODE
        )));
    }
    Ok(())
}
