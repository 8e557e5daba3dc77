//! Clock capability used for time synchronization.
//!
//! The node's real-time clock is an external collaborator. The protocol
//! engine only needs to read the current second (for the `TIME` message) and,
//! on some boards, the sub-second milliseconds (for sample timestamps).
//! [`Clock::set_secs`] lets the owner re-synchronize it from a collector time.

/// A monotonic seconds counter with millisecond resolution.
pub trait Clock {
    /// Current time, in whole seconds.
    fn secs(&mut self) -> u32;

    /// Milliseconds elapsed within the current second (`0..=999`).
    fn millis(&mut self) -> u16;

    /// Re-synchronizes the clock to `secs`.
    fn set_secs(&mut self, secs: u32);

    /// Current time in milliseconds.
    fn now_ms(&mut self) -> u64 {
        let secs = self.secs();
        u64::from(secs) * 1_000 + u64::from(self.millis())
    }
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn secs(&mut self) -> u32 {
        (**self).secs()
    }

    fn millis(&mut self) -> u16 {
        (**self).millis()
    }

    fn set_secs(&mut self, secs: u32) {
        (**self).set_secs(secs)
    }
}
