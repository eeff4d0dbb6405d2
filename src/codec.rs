//! Fixed-length typed payloads for I2C transfers.
//!
//! A device driver describes its wire format once, as a type implementing
//! [`I2cReadable`] and/or [`I2cWritable`], and moves values through
//! [`I2cEndpoint::decode`](crate::i2c::I2cEndpoint::decode) and friends.
//! The endpoint checks lengths on both sides; the codec only converts.

/// A value decoded from exactly `DATA_LENGTH` bytes read off the bus.
pub trait I2cReadable: Sized {
    /// Number of bytes one value occupies on the wire.
    const DATA_LENGTH: usize;

    /// Decodes a value. `bytes` is always `DATA_LENGTH` long.
    fn from_bytes(bytes: &[u8]) -> Self;
}

/// A value encoded to exactly `DATA_LENGTH` bytes for writing.
pub trait I2cWritable {
    /// Number of bytes one value occupies on the wire.
    const DATA_LENGTH: usize;

    /// Encodes the value. A result of any other length is rejected by the
    /// endpoint before anything is sent.
    fn to_bytes(&self) -> Vec<u8>;
}

impl<const N: usize> I2cReadable for [u8; N] {
    const DATA_LENGTH: usize = N;

    fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes[..N]);
        out
    }
}

impl<const N: usize> I2cWritable for [u8; N] {
    const DATA_LENGTH: usize = N;

    fn to_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}
