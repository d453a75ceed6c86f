//! Wall-clock seam for the time-of-day greeting.

use chrono::Timelike;

pub trait Clock: Send + Sync {
    /// Local hour of day, 0..=23.
    fn hour(&self) -> u32;
}

/// Reads the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}
