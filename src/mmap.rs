//! Physical memory mapping of register pages.
//!
//! A [`MappedWindow`] owns one open device file (`/dev/gpiomem` or
//! `/dev/mem`) and one page mapped from it. Controllers only ever see the
//! [`RegisterWindow`] trait: whole 32-bit words, read and written with
//! volatile accesses, one load or store per call.

use crate::consts;
use crate::error::{Error, Result};
use log::{debug, trace, warn};
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::rc::Rc;

/// Number of 32-bit registers in one window.
pub const WINDOW_WORDS: usize = consts::PAGE_SIZE / 4;

/// Word-granular access to a page of 32-bit hardware registers.
///
/// `index` is a register index (byte offset / 4), not a byte offset.
/// Implementations must panic on an index outside the window rather than
/// touch memory they do not own.
pub trait RegisterWindow {
    /// Reads one register.
    fn read_word(&self, index: usize) -> u32;
    /// Writes one register.
    fn write_word(&mut self, index: usize, value: u32);
}

/// A page of physical memory mapped through a device file.
///
/// Unmapped and closed exactly once, when dropped.
#[derive(Debug)]
pub struct MappedWindow {
    base: NonNull<u32>,
    // Held open for the lifetime of the mapping; closes on drop.
    _file: File,
    path: PathBuf,
    offset: u64,
}

// The mapping is owned by this value; writes need `&mut self`.
unsafe impl Send for MappedWindow {}

impl MappedWindow {
    /// Device file the page was mapped through.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Physical offset of the page.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl RegisterWindow for MappedWindow {
    #[inline]
    fn read_word(&self, index: usize) -> u32 {
        assert!(index < WINDOW_WORDS, "register index {} outside window", index);
        let value = unsafe { std::ptr::read_volatile(self.base.as_ptr().add(index)) };
        trace!("R [0x{:08X}+{:03X}] = 0x{:08X}", self.offset, index * 4, value);
        value
    }

    #[inline]
    fn write_word(&mut self, index: usize, value: u32) {
        assert!(index < WINDOW_WORDS, "register index {} outside window", index);
        trace!("W [0x{:08X}+{:03X}] = 0x{:08X}", self.offset, index * 4, value);
        unsafe { std::ptr::write_volatile(self.base.as_ptr().add(index), value) }
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        let rc = unsafe { libc::munmap(self.base.as_ptr() as *mut libc::c_void, consts::PAGE_SIZE) };
        if rc != 0 {
            warn!(
                "munmap of 0x{:08X} ({}) failed: {}",
                self.offset,
                self.path.display(),
                io::Error::last_os_error()
            );
        } else {
            debug!("Unmapped 0x{:08X} ({})", self.offset, self.path.display());
        }
    }
}

/// Maps one page at physical `offset` through the first candidate device
/// file that opens.
///
/// Candidates are tried in order with read/write access and `O_SYNC`. No
/// retry is attempted: if none opens the error is [`Error::PermissionDenied`]
/// when at least one refused access, [`Error::DeviceNotFound`] otherwise. A
/// failed `mmap` is [`Error::MapFailed`].
pub fn map_window<P: AsRef<Path>>(paths: &[P], offset: u64) -> Result<MappedWindow> {
    if offset % consts::PAGE_SIZE as u64 != 0 {
        return Err(Error::InvalidArgument(format!(
            "physical offset 0x{:08X} is not page aligned",
            offset
        )));
    }

    let mut failures: Vec<(PathBuf, io::ErrorKind)> = Vec::new();
    let mut opened: Option<(File, PathBuf)> = None;
    for path in paths {
        let path = path.as_ref();
        match OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
        {
            Ok(file) => {
                opened = Some((file, path.to_path_buf()));
                break;
            }
            Err(e) => {
                debug!("Cannot open {}: {}", path.display(), e);
                failures.push((path.to_path_buf(), e.kind()));
            }
        }
    }

    let (file, path) = match opened {
        Some(found) => found,
        None => return Err(open_failure(paths, &failures)),
    };

    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            consts::PAGE_SIZE,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            offset as libc::off_t,
        )
    };
    if ptr == libc::MAP_FAILED {
        let source = io::Error::last_os_error();
        warn!("mmap of 0x{:08X} through {} failed: {}", offset, path.display(), source);
        return Err(Error::MapFailed {
            path: path.display().to_string(),
            offset,
            source,
        });
    }
    let base = NonNull::new(ptr as *mut u32).ok_or_else(|| Error::MapFailed {
        path: path.display().to_string(),
        offset,
        source: io::Error::other("mmap returned a null mapping"),
    })?;

    debug!("Mapped 0x{:08X} through {}", offset, path.display());
    Ok(MappedWindow {
        base,
        _file: file,
        path,
        offset,
    })
}

/// Error for a mapping where no candidate opened.
///
/// The first candidate refused with EACCES/EPERM wins; without one, every
/// candidate is listed as not found.
fn open_failure<P: AsRef<Path>>(paths: &[P], failures: &[(PathBuf, io::ErrorKind)]) -> Error {
    match failures
        .iter()
        .find(|(_, kind)| *kind == io::ErrorKind::PermissionDenied)
    {
        Some((path, _)) => Error::PermissionDenied {
            path: path.display().to_string(),
        },
        None => Error::DeviceNotFound {
            paths: paths
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect(),
        },
    }
}

/// A heap-backed window for dry runs and tests.
///
/// Clones share the same backing words, so a test can hand one clone to a
/// controller and inspect the registers through another.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    words: Rc<RefCell<Vec<u32>>>,
}

impl MemoryWindow {
    /// A zero-filled window.
    pub fn new() -> Self {
        Self {
            words: Rc::new(RefCell::new(vec![0; WINDOW_WORDS])),
        }
    }

    /// Current value of a register.
    pub fn get(&self, index: usize) -> u32 {
        self.words.borrow()[index]
    }

    /// Overwrites a register, as the hardware side would.
    pub fn set(&self, index: usize, value: u32) {
        self.words.borrow_mut()[index] = value;
    }
}

impl Default for MemoryWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterWindow for MemoryWindow {
    fn read_word(&self, index: usize) -> u32 {
        assert!(index < WINDOW_WORDS, "register index {} outside window", index);
        self.get(index)
    }

    fn write_word(&mut self, index: usize, value: u32) {
        assert!(index < WINDOW_WORDS, "register index {} outside window", index);
        self.set(index, value);
    }
}
