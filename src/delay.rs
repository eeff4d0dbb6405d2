//! Blocking settle delays.
//!
//! Hardware sequences in this crate (pull-up latching, clock restarts,
//! device ready polling) wait through a [`Delay`] rather than calling
//! `thread::sleep` directly, so tests can record the waits instead of
//! sleeping through them.

use std::thread;
use std::time::Duration;

/// Something that can block the calling thread for a short time.
pub trait Delay {
    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u64);

    /// Blocks for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u64) {
        self.delay_us(ms * 1000);
    }
}

/// Sleeps the current thread. The default for every controller.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    #[inline]
    fn delay_us(&mut self, us: u64) {
        thread::sleep(Duration::from_micros(us));
    }
}

impl<D: Delay + ?Sized> Delay for &mut D {
    #[inline]
    fn delay_us(&mut self, us: u64) {
        (**self).delay_us(us);
    }
}
