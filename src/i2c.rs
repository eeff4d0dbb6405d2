//! I2C and SMBus transfers over a Linux `/dev/i2c-N` bus device.
//!
//! An [`I2cBus`] owns the bus handle and the one piece of state the kernel
//! keeps per open file: the currently selected slave address. Devices are
//! talked to through an [`I2cEndpoint`], a short-lived `(bus, address)` view
//! that borrows the bus mutably, so two endpoints can never interleave
//! address switches.
//!
//! Raw I2C transfers (`I2C_RDWR`) carry the address in every message and do
//! not touch the selected address. SMBus transfers (`I2C_SMBUS`) act on the
//! selected address, which is switched with `I2C_SLAVE_FORCE` only when it
//! differs from the last one selected.

mod linux;

pub use linux::LinuxI2c;

use crate::codec::{I2cReadable, I2cWritable};
use crate::consts;
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::ops::RangeInclusive;

/// A 7-bit I2C slave address (0x00 - 0x7F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// Creates an address, checking it fits in 7 bits.
    pub fn new(addr: u8) -> Result<Self> {
        if addr <= consts::i2c::MAX_7BIT_ADDRESS {
            Ok(I2cAddress(addr))
        } else {
            Err(Error::InvalidArgument(format!(
                "I2C address 0x{:02X} out of range (7-bit, 0x00-0x7F)",
                addr
            )))
        }
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for I2cAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// The `read_write` field of an SMBus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbusDirection {
    Read,
    Write,
}

impl SmbusDirection {
    pub fn raw(self) -> u8 {
        match self {
            SmbusDirection::Read => consts::i2c::SMBUS_READ,
            SmbusDirection::Write => consts::i2c::SMBUS_WRITE,
        }
    }
}

/// The `size` field of an SMBus transaction: what shape the payload has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbusKind {
    /// No payload; the direction bit is the data.
    Quick,
    /// One byte with no command code.
    Byte,
    /// Command code followed by one byte.
    ByteData,
    /// Command code followed by a little-endian word.
    WordData,
    /// Command code followed by a length byte and up to 32 bytes.
    BlockData,
}

impl SmbusKind {
    pub fn raw(self) -> u32 {
        match self {
            SmbusKind::Quick => consts::i2c::SMBUS_QUICK,
            SmbusKind::Byte => consts::i2c::SMBUS_BYTE,
            SmbusKind::ByteData => consts::i2c::SMBUS_BYTE_DATA,
            SmbusKind::WordData => consts::i2c::SMBUS_WORD_DATA,
            SmbusKind::BlockData => consts::i2c::SMBUS_BLOCK_DATA,
        }
    }
}

/// Payload buffer of one SMBus transaction.
///
/// Byte data and words sit at the start; block data is a length byte
/// followed by the block.
pub type SmbusBuffer = [u8; consts::i2c::SMBUS_BUFFER_SIZE];

/// The kernel-facing side of a bus: one open handle and its ioctls.
///
/// [`LinuxI2c`] is the real implementation; tests substitute their own.
pub trait I2cTransport {
    /// Makes `address` the target of subsequent SMBus transactions.
    fn select_address(&mut self, address: I2cAddress) -> io::Result<()>;

    /// One raw read message of `buf.len()` bytes from `address`.
    fn read(&mut self, address: I2cAddress, buf: &mut [u8]) -> io::Result<()>;

    /// One raw write message of `data` to `address`.
    fn write(&mut self, address: I2cAddress, data: &[u8]) -> io::Result<()>;

    /// One SMBus transaction with the selected address.
    fn smbus(
        &mut self,
        direction: SmbusDirection,
        command: u8,
        kind: SmbusKind,
        data: Option<&mut SmbusBuffer>,
    ) -> io::Result<()>;
}

type Opener<T> = Box<dyn FnMut(&str) -> io::Result<T> + Send>;

/// One I2C bus, opened on first use.
pub struct I2cBus<T: I2cTransport = LinuxI2c> {
    bus_id: u8,
    path: String,
    opener: Opener<T>,
    handle: Option<T>,
    current_address: Option<I2cAddress>,
    endpoints: BTreeSet<I2cAddress>,
}

impl I2cBus<LinuxI2c> {
    /// Bus `/dev/i2c-<bus_id>`. Nothing is opened until the first transfer.
    pub fn new(bus_id: u8) -> Self {
        Self::with_opener(bus_id, LinuxI2c::open)
    }
}

impl<T: I2cTransport> I2cBus<T> {
    /// Bus whose handle is produced by `opener` from the device path.
    pub fn with_opener<F>(bus_id: u8, opener: F) -> Self
    where
        F: FnMut(&str) -> io::Result<T> + Send + 'static,
    {
        I2cBus {
            bus_id,
            path: format!("{}{}", consts::i2c::DEVICE_PREFIX, bus_id),
            opener: Box::new(opener),
            handle: None,
            current_address: None,
            endpoints: BTreeSet::new(),
        }
    }

    pub fn bus_id(&self) -> u8 {
        self.bus_id
    }

    /// Device file path of this bus.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Address last selected for SMBus transfers, if any.
    pub fn current_address(&self) -> Option<I2cAddress> {
        self.current_address
    }

    /// Every address an endpoint has been requested for, in ascending order.
    pub fn endpoints(&self) -> impl Iterator<Item = I2cAddress> + '_ {
        self.endpoints.iter().copied()
    }

    /// Closes the bus handle. The next transfer reopens it.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            debug!("Closing I2C bus {}", self.bus_id);
        }
        self.current_address = None;
    }

    /// View of the device at `address` on this bus.
    pub fn endpoint(&mut self, address: u8) -> Result<I2cEndpoint<'_, T>> {
        let address = I2cAddress::new(address)?;
        if self.endpoints.insert(address) {
            debug!("I2C bus {}: new endpoint {}", self.bus_id, address);
        }
        Ok(I2cEndpoint { bus: self, address })
    }

    /// True if a device answers an SMBus byte read of command 0 at `address`.
    pub fn is_reachable(&mut self, address: I2cAddress) -> bool {
        let bus = self.bus_id;
        let mut buf = new_buffer();
        let result = self.select(address).and_then(|handle| {
            handle
                .smbus(SmbusDirection::Read, 0, SmbusKind::ByteData, Some(&mut buf))
                .map_err(|source| Error::IoFailure {
                    bus,
                    address,
                    operation: "reachability probe",
                    source,
                })
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                trace!("I2C bus {}: {} not reachable: {}", self.bus_id, address, e);
                false
            }
        }
    }

    /// Addresses in `range` that answer [`is_reachable`](Self::is_reachable).
    ///
    /// Fails only if the bus cannot be opened or the range leaves 7 bits.
    /// The range is checked before the bus is touched.
    pub fn scan(&mut self, range: RangeInclusive<u8>) -> Result<Vec<I2cAddress>> {
        let addresses = range
            .map(I2cAddress::new)
            .collect::<Result<Vec<_>>>()?;
        self.handle()?;
        let mut found = Vec::new();
        for address in addresses {
            if self.is_reachable(address) {
                debug!("I2C bus {}: device found at {}", self.bus_id, address);
                found.push(address);
            }
        }
        Ok(found)
    }

    /// Scans the usual non-reserved range, 0x08 to 0x77.
    pub fn scan_default(&mut self) -> Result<Vec<I2cAddress>> {
        self.scan(consts::i2c::SCAN_FIRST..=consts::i2c::SCAN_LAST)
    }

    fn handle(&mut self) -> Result<&mut T> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => {
                debug!("Opening I2C bus {} ({})", self.bus_id, self.path);
                (self.opener)(&self.path).map_err(|source| {
                    warn!("Failed to open {}: {}", self.path, source);
                    Error::DeviceOpenFailed {
                        path: self.path.clone(),
                        source,
                    }
                })?
            }
        };
        Ok(self.handle.insert(handle))
    }

    fn select(&mut self, address: I2cAddress) -> Result<&mut T> {
        if self.current_address != Some(address) {
            debug!("I2C bus {}: selecting address {}", self.bus_id, address);
            let result = self.handle()?.select_address(address);
            if let Err(source) = result {
                warn!(
                    "I2C bus {}: selecting {} failed: {}",
                    self.bus_id, address, source
                );
                self.current_address = None;
                return Err(Error::AddressSelectFailed {
                    bus: self.bus_id,
                    address,
                    source,
                });
            }
            self.current_address = Some(address);
        }
        self.handle()
    }
}

impl<T: I2cTransport> fmt::Debug for I2cBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2cBus")
            .field("bus_id", &self.bus_id)
            .field("path", &self.path)
            .field("open", &self.handle.is_some())
            .field("current_address", &self.current_address)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// A device at one address on a bus.
pub struct I2cEndpoint<'a, T: I2cTransport = LinuxI2c> {
    bus: &'a mut I2cBus<T>,
    address: I2cAddress,
}

impl<T: I2cTransport> I2cEndpoint<'_, T> {
    pub fn address(&self) -> I2cAddress {
        self.address
    }

    pub fn bus_id(&self) -> u8 {
        self.bus.bus_id
    }

    /// True if the device answers an SMBus byte read of command 0.
    pub fn reachable(&mut self) -> bool {
        self.bus.is_reachable(self.address)
    }

    /// Like [`reachable`](Self::reachable), as an error for drivers to propagate.
    pub fn probe(&mut self) -> Result<()> {
        if self.reachable() {
            Ok(())
        } else {
            warn!(
                "No device answered at {} on I2C bus {}",
                self.address, self.bus.bus_id
            );
            Err(Error::UnreachableDevice {
                bus: self.bus.bus_id,
                address: self.address,
            })
        }
    }

    fn io_failure(&self, operation: &'static str, source: io::Error) -> Error {
        warn!(
            "I2C bus {}: {} at {} failed: {}",
            self.bus.bus_id, operation, self.address, source
        );
        Error::IoFailure {
            bus: self.bus.bus_id,
            address: self.address,
            operation,
            source,
        }
    }

    fn protocol_violation(&self, message: String) -> Error {
        warn!(
            "I2C bus {}: protocol violation at {}: {}",
            self.bus.bus_id, self.address, message
        );
        Error::ProtocolViolation {
            bus: self.bus.bus_id,
            address: self.address,
            message,
        }
    }

    // --- Raw I2C ---

    /// Reads `buf.len()` bytes in one message.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let address = self.address;
        let result = self.bus.handle()?.read(address, buf);
        result.map_err(|e| self.io_failure("I2C read", e))?;
        trace!("I2C read from {}: {:02X?}", address, buf);
        Ok(())
    }

    /// Reads `len` bytes in one message.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read(&mut buf)?;
        Ok(buf)
    }

    /// Writes `data` in one message.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let address = self.address;
        trace!("I2C write to {}: {:02X?}", address, data);
        let result = self.bus.handle()?.write(address, data);
        result.map_err(|e| self.io_failure("I2C write", e))
    }

    pub fn receive_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Two-byte read, little-endian.
    pub fn receive_word(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn send_byte(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    /// Two-byte write, little-endian.
    pub fn send_word(&mut self, value: u16) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Reads exactly `R::DATA_LENGTH` bytes and decodes them.
    pub fn decode<R: I2cReadable>(&mut self) -> Result<R> {
        let bytes = self.read_vec(R::DATA_LENGTH)?;
        Ok(R::from_bytes(&bytes))
    }

    /// Encodes `value` and writes it in one message.
    pub fn encode<W: I2cWritable>(&mut self, value: &W) -> Result<()> {
        let bytes = self.encoded(value)?;
        self.write(&bytes)
    }

    fn encoded<W: I2cWritable>(&self, value: &W) -> Result<Vec<u8>> {
        let bytes = value.to_bytes();
        if bytes.len() != W::DATA_LENGTH {
            return Err(self.protocol_violation(format!(
                "encoded {} bytes, expected {}",
                bytes.len(),
                W::DATA_LENGTH
            )));
        }
        Ok(bytes)
    }

    // --- SMBus ---

    fn smbus(
        &mut self,
        operation: &'static str,
        direction: SmbusDirection,
        command: u8,
        kind: SmbusKind,
        data: Option<&mut SmbusBuffer>,
    ) -> Result<()> {
        let result = self
            .bus
            .select(self.address)?
            .smbus(direction, command, kind, data);
        result.map_err(|e| self.io_failure(operation, e))
    }

    /// SMBus quick command: the direction bit alone, no data.
    pub fn write_quick(&mut self, direction: SmbusDirection) -> Result<()> {
        self.smbus("SMBus quick", direction, 0, SmbusKind::Quick, None)
    }

    /// SMBus receive byte (no command code).
    pub fn smbus_receive_byte(&mut self) -> Result<u8> {
        let mut buf = new_buffer();
        self.smbus(
            "SMBus receive byte",
            SmbusDirection::Read,
            0,
            SmbusKind::Byte,
            Some(&mut buf),
        )?;
        Ok(buf[0])
    }

    /// SMBus send byte: the value travels in the command field.
    pub fn smbus_send_byte(&mut self, value: u8) -> Result<()> {
        self.smbus(
            "SMBus send byte",
            SmbusDirection::Write,
            value,
            SmbusKind::Byte,
            None,
        )
    }

    pub fn read_byte(&mut self, command: u8) -> Result<u8> {
        let mut buf = new_buffer();
        self.smbus(
            "SMBus read byte",
            SmbusDirection::Read,
            command,
            SmbusKind::ByteData,
            Some(&mut buf),
        )?;
        trace!("SMBus {} [0x{:02X}] -> 0x{:02X}", self.address, command, buf[0]);
        Ok(buf[0])
    }

    /// Reads a little-endian word.
    pub fn read_word(&mut self, command: u8) -> Result<u16> {
        let mut buf = new_buffer();
        self.smbus(
            "SMBus read word",
            SmbusDirection::Read,
            command,
            SmbusKind::WordData,
            Some(&mut buf),
        )?;
        let value = u16::from_le_bytes([buf[0], buf[1]]);
        trace!("SMBus {} [0x{:02X}] -> 0x{:04X}", self.address, command, value);
        Ok(value)
    }

    /// Reads a block; the device's length byte must not exceed 32.
    pub fn read_block(&mut self, command: u8) -> Result<Vec<u8>> {
        let mut buf = new_buffer();
        self.smbus(
            "SMBus read block",
            SmbusDirection::Read,
            command,
            SmbusKind::BlockData,
            Some(&mut buf),
        )?;
        let len = buf[0] as usize;
        if len > consts::i2c::SMBUS_BLOCK_MAX {
            return Err(self.protocol_violation(format!(
                "block length byte {} exceeds {}",
                len,
                consts::i2c::SMBUS_BLOCK_MAX
            )));
        }
        let block = buf[1..=len].to_vec();
        trace!("SMBus {} [0x{:02X}] -> {:02X?}", self.address, command, block);
        Ok(block)
    }

    pub fn write_byte(&mut self, command: u8, value: u8) -> Result<()> {
        trace!("SMBus {} [0x{:02X}] <- 0x{:02X}", self.address, command, value);
        let mut buf = new_buffer();
        buf[0] = value;
        self.smbus(
            "SMBus write byte",
            SmbusDirection::Write,
            command,
            SmbusKind::ByteData,
            Some(&mut buf),
        )
    }

    /// Writes a little-endian word.
    pub fn write_word(&mut self, command: u8, value: u16) -> Result<()> {
        trace!("SMBus {} [0x{:02X}] <- 0x{:04X}", self.address, command, value);
        let mut buf = new_buffer();
        buf[..2].copy_from_slice(&value.to_le_bytes());
        self.smbus(
            "SMBus write word",
            SmbusDirection::Write,
            command,
            SmbusKind::WordData,
            Some(&mut buf),
        )
    }

    /// Writes a block of at most 32 bytes. Longer data is rejected before
    /// anything reaches the bus.
    pub fn write_block(&mut self, command: u8, data: &[u8]) -> Result<()> {
        if data.len() > consts::i2c::SMBUS_BLOCK_MAX {
            return Err(self.protocol_violation(format!(
                "block of {} bytes exceeds {}",
                data.len(),
                consts::i2c::SMBUS_BLOCK_MAX
            )));
        }
        trace!("SMBus {} [0x{:02X}] <- {:02X?}", self.address, command, data);
        let mut buf = new_buffer();
        buf[0] = data.len() as u8;
        buf[1..=data.len()].copy_from_slice(data);
        self.smbus(
            "SMBus write block",
            SmbusDirection::Write,
            command,
            SmbusKind::BlockData,
            Some(&mut buf),
        )
    }

    /// Reads a block that must be exactly `R::DATA_LENGTH` bytes and decodes it.
    pub fn decode_block<R: I2cReadable>(&mut self, command: u8) -> Result<R> {
        let block = self.read_block(command)?;
        if block.len() != R::DATA_LENGTH {
            return Err(self.protocol_violation(format!(
                "block read returned {} bytes, expected {}",
                block.len(),
                R::DATA_LENGTH
            )));
        }
        Ok(R::from_bytes(&block))
    }

    /// Encodes `value` and writes it as one block.
    pub fn encode_block<W: I2cWritable>(&mut self, command: u8, value: &W) -> Result<()> {
        let bytes = self.encoded(value)?;
        self.write_block(command, &bytes)
    }
}

impl<T: I2cTransport> fmt::Debug for I2cEndpoint<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("I2cEndpoint")
            .field("bus", &self.bus.bus_id)
            .field("address", &self.address)
            .finish()
    }
}

fn new_buffer() -> SmbusBuffer {
    [0; consts::i2c::SMBUS_BUFFER_SIZE]
}
