//! `/dev/i2c-N` character device and its i2c-dev ioctls.

use super::{I2cAddress, I2cTransport, SmbusBuffer, SmbusDirection, SmbusKind};
use crate::consts;
use log::trace;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;

// struct i2c_msg
#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

// struct i2c_rdwr_ioctl_data
#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

// struct i2c_smbus_ioctl_data
#[repr(C)]
struct I2cSmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut SmbusBuffer,
}

/// An open I2C bus device. Closed when dropped.
#[derive(Debug)]
pub struct LinuxI2c {
    file: File,
}

impl LinuxI2c {
    /// Opens a bus device such as `/dev/i2c-1` for reading and writing.
    pub fn open(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(LinuxI2c { file })
    }

    fn check(rc: libc::c_int) -> io::Result<()> {
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn transfer(&mut self, address: I2cAddress, flags: u16, buf: *mut u8, len: usize) -> io::Result<()> {
        let len = u16::try_from(len).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("I2C message of {} bytes is too long", len),
            )
        })?;
        let mut msg = I2cMsg {
            addr: address.value() as u16,
            flags,
            len,
            buf,
        };
        let mut data = I2cRdwrIoctlData {
            msgs: &mut msg,
            nmsgs: 1,
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                consts::i2c::I2C_RDWR as _,
                &mut data as *mut I2cRdwrIoctlData,
            )
        };
        Self::check(rc)
    }
}

impl I2cTransport for LinuxI2c {
    fn select_address(&mut self, address: I2cAddress) -> io::Result<()> {
        trace!("ioctl I2C_SLAVE_FORCE {}", address);
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                consts::i2c::I2C_SLAVE_FORCE as _,
                address.value() as libc::c_ulong,
            )
        };
        Self::check(rc)
    }

    fn read(&mut self, address: I2cAddress, buf: &mut [u8]) -> io::Result<()> {
        self.transfer(address, consts::i2c::I2C_M_RD, buf.as_mut_ptr(), buf.len())
    }

    fn write(&mut self, address: I2cAddress, data: &[u8]) -> io::Result<()> {
        // The kernel only reads from the buffer of a write message
        self.transfer(address, 0, data.as_ptr() as *mut u8, data.len())
    }

    fn smbus(
        &mut self,
        direction: SmbusDirection,
        command: u8,
        kind: SmbusKind,
        data: Option<&mut SmbusBuffer>,
    ) -> io::Result<()> {
        trace!(
            "ioctl I2C_SMBUS {:?} {:?} command 0x{:02X}",
            direction,
            kind,
            command
        );
        let mut args = I2cSmbusIoctlData {
            read_write: direction.raw(),
            command,
            size: kind.raw(),
            data: data.map_or(std::ptr::null_mut(), |buf| buf as *mut SmbusBuffer),
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                consts::i2c::I2C_SMBUS as _,
                &mut args as *mut I2cSmbusIoctlData,
            )
        };
        Self::check(rc)
    }
}
