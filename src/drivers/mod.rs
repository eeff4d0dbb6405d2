//! Drivers for I2C devices commonly wired to the header.

pub mod mcp4725;
pub mod pca9685;

pub use mcp4725::Mcp4725;
pub use pca9685::Pca9685;
