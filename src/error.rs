use crate::i2c::I2cAddress;
use thiserror::Error;

/// Errors that can occur when touching board hardware.
///
/// Every variant names the resource involved (device file, bus, address or
/// channel) so a failure can be traced back to the hardware it came from.
/// Nothing in this crate retries a failed operation; the error is handed to
/// the immediate caller.
#[derive(Error, Debug)]
pub enum Error {
    /// A register device file exists but this process may not open it.
    #[error("Permission denied opening '{path}' (root or gpio group membership required)")]
    PermissionDenied {
        /// The device file that refused access.
        path: String,
    },
    /// None of the candidate device files could be opened.
    #[error("No usable device file found (tried: {})", .paths.join(", "))]
    DeviceNotFound {
        /// The candidate paths, in the order they were tried.
        paths: Vec<String>,
    },
    /// The device file opened, but mapping the page failed.
    #[error("Failed to map physical offset 0x{offset:08X} through '{path}': {source}")]
    MapFailed {
        /// The device file used for the mapping.
        path: String,
        /// Physical offset of the requested page.
        offset: u64,
        /// Error reported by `mmap`.
        source: std::io::Error,
    },
    /// An I2C bus character device could not be opened.
    #[error("Failed to open I2C bus device '{path}': {source}")]
    DeviceOpenFailed {
        /// Path of the bus device (e.g. `/dev/i2c-1`).
        path: String,
        /// Error reported by `open`.
        source: std::io::Error,
    },
    /// The kernel rejected the address-select ioctl.
    #[error("I2C bus {bus}: failed to select slave address {address}: {source}")]
    AddressSelectFailed {
        /// Kernel bus index.
        bus: u8,
        /// The address that could not be selected.
        address: I2cAddress,
        /// Error reported by the ioctl.
        source: std::io::Error,
    },
    /// A raw I2C or SMBus transaction ioctl returned an error.
    #[error("I2C bus {bus}: {operation} at address {address} failed: {source}")]
    IoFailure {
        /// Kernel bus index.
        bus: u8,
        /// Target device address.
        address: I2cAddress,
        /// The transaction that failed (e.g. "SMBus read word").
        operation: &'static str,
        /// Error reported by the ioctl.
        source: std::io::Error,
    },
    /// Data on the wire (or handed to the transport) broke the framing rules.
    #[error("I2C bus {bus}: protocol violation at address {address}: {message}")]
    ProtocolViolation {
        /// Kernel bus index.
        bus: u8,
        /// Target device address.
        address: I2cAddress,
        /// What was wrong with the data.
        message: String,
    },
    /// A probe of the device did not get an answer.
    #[error("No device answered at I2C address {address} on bus {bus}")]
    UnreachableDevice {
        /// Kernel bus index.
        bus: u8,
        /// The address that did not answer.
        address: I2cAddress,
    },
    /// The device kept reporting busy until the caller's poll limit ran out.
    #[error("Device at I2C address {address} on bus {bus} still busy after {attempts} polls")]
    DeviceBusy {
        /// Kernel bus index.
        bus: u8,
        /// The address that stayed busy.
        address: I2cAddress,
        /// How many status reads were made.
        attempts: u32,
    },
    /// Function argument is outside the valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The running machine is not a board this crate knows how to map.
    #[error("Unsupported board: {0}")]
    UnsupportedBoard(String),
}

/// Result type alias for hardware operations.
///
/// This is a convenience alias for `std::result::Result<T, Error>` used
/// throughout the crate to reduce boilerplate.
pub type Result<T> = std::result::Result<T, Error>;

// Helpers for the common InvalidArgument cases
pub(crate) fn invalid_pin(pin: u8) -> Error {
    Error::InvalidArgument(format!("GPIO pin {} out of range (0-31)", pin))
}

pub(crate) fn invalid_pwm_channel(index: usize, count: usize) -> Error {
    Error::InvalidArgument(format!(
        "PWM channel {} out of range (device has {} channels)",
        index, count
    ))
}
