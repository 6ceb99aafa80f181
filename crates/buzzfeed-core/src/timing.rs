//! Wait directive timing
//!
//! Waits are spun against a monotonic clock rather than slept, since the
//! controller relies on sub-millisecond spacing between packets.

use std::time::{Duration, Instant};

use byteorder::{ByteOrder, LittleEndian};

/// Something that can block the caller for a given duration
pub trait Waiter {
    /// Block until `duration` has elapsed
    fn wait(&mut self, duration: Duration);
}

/// Busy-wait against [`Instant`] without yielding to the scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinWait;

impl Waiter for SpinWait {
    fn wait(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

impl<W: Waiter + ?Sized> Waiter for &mut W {
    fn wait(&mut self, duration: Duration) {
        (**self).wait(duration)
    }
}

/// Decode the two wait bytes (low first) into a duration in milliseconds
pub fn wait_duration(low: u8, high: u8) -> Duration {
    let millis = LittleEndian::read_u16(&[low, high]);
    Duration::from_millis(u64::from(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_duration_little_endian() {
        assert_eq!(wait_duration(0x00, 0x0A), Duration::from_millis(2560));
        assert_eq!(wait_duration(0xE8, 0x03), Duration::from_millis(1000));
        assert_eq!(wait_duration(0xFF, 0xFF), Duration::from_millis(65535));
        assert_eq!(wait_duration(0, 0), Duration::ZERO);
    }

    #[test]
    fn test_spin_wait_reaches_deadline() {
        let start = Instant::now();
        SpinWait.wait(Duration::from_millis(5));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_spin_wait_zero_returns() {
        let start = Instant::now();
        SpinWait.wait(Duration::ZERO);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
