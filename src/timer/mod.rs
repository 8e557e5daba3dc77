//! Pacing utilities: the polling retry combinator and the two ways of driving
//! capture.
//!
//! Every wait in the link protocol is a spin/poll loop with a fixed delay
//! between polls, because the modem's "bytes available" signal under-reports
//! mid-transmission. [`Retry`] is that loop, written once and shared by the
//! ack wait, the configuration wait, the ping loop and the per-byte settle of
//! the line reader.
//!
//! Capture itself is paced in one of two ways:
//! - `timer-isr` (default): a sampling interrupt pushes into a buffer shared
//!   through `critical_section` (`global_buffer_*` and the
//!   [`init_sample_buffer!`](crate::init_sample_buffer) family of macros).
//! - `delay-loop`: [`run_capture_loop`] samples in a blocking loop paced by
//!   an `embedded_hal::delay::DelayNs`.
//!
//! | Wait site          | Attempts                    | Delay between polls           |
//! |--------------------|-----------------------------|-------------------------------|
//! | ack wait           | [`ACK_ATTEMPTS`]            | [`ACK_RETRY_DELAY_MS`]        |
//! | line-read settle   | until the line ends         | [`BYTE_SETTLE_US`]            |
//! | configuration wait | forever                     | none                          |
//! | ping loop          | forever                     | [`PING_INTERVAL_MS`]          |

use crate::consts::{
    ACK_ATTEMPTS, ACK_RETRY_DELAY_MS, BYTE_SETTLE_US, PING_INTERVAL_MS, US_PER_MS,
};

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// A poll-then-delay retry policy.
///
/// [`run`](Retry::run) calls the poll, and after every miss pauses for
/// `delay_us` before polling again. With a bound of `n` attempts the poll is
/// called at most `n` times (at least once) and no pause follows the last
/// miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Retry {
    /// Maximum number of polls, or `None` to keep polling until one succeeds.
    pub attempts: Option<u32>,
    /// Pause after a missed poll, in microseconds.
    pub delay_us: u32,
}

impl Retry {
    /// Policy of the acknowledgement wait.
    pub const ACK: Self = Self::bounded(ACK_ATTEMPTS, ACK_RETRY_DELAY_MS * US_PER_MS);
    /// Policy of the line reader: keep reading, settle between bytes.
    pub const LINE_SETTLE: Self = Self::forever(BYTE_SETTLE_US);
    /// Policy of the configuration wait: poll back to back.
    pub const CONFIG: Self = Self::forever(0);
    /// Policy of the ping loop: one ping per interval.
    pub const PING: Self = Self::forever(PING_INTERVAL_MS * US_PER_MS);

    /// At most `attempts` polls, `delay_us` apart.
    pub const fn bounded(attempts: u32, delay_us: u32) -> Self {
        Self {
            attempts: Some(attempts),
            delay_us,
        }
    }

    /// Polls until success, `delay_us` apart.
    pub const fn forever(delay_us: u32) -> Self {
        Self {
            attempts: None,
            delay_us,
        }
    }

    /// Calls `poll` against `ctx` until it yields a value or the attempt
    /// budget is spent.
    ///
    /// `pause` receives the same context and the configured delay, so the
    /// poll and the pause can share one owner of the delay provider.
    ///
    /// ```rust
    /// use sensorlink::timer::Retry;
    ///
    /// let mut polls = 0u32;
    /// let mut paused_us = 0u32;
    /// let found = Retry::bounded(3, 5).run(
    ///     &mut polls,
    ///     |polls| {
    ///         *polls += 1;
    ///         (*polls == 2).then_some("ack")
    ///     },
    ///     |_, us| paused_us += us,
    /// );
    /// assert_eq!(found, Some("ack"));
    /// assert_eq!(paused_us, 5);
    /// ```
    pub fn run<X, R>(
        &self,
        ctx: &mut X,
        mut poll: impl FnMut(&mut X) -> Option<R>,
        mut pause: impl FnMut(&mut X, u32),
    ) -> Option<R> {
        let mut remaining = self.attempts;
        loop {
            if let Some(found) = poll(ctx) {
                return Some(found);
            }
            if let Some(left) = remaining.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    return None;
                }
            }
            pause(ctx, self.delay_us);
        }
    }

    /// Calls `poll` until it yields a value, ignoring any attempt bound.
    ///
    /// Used by the waits that only end on success (configuration wait, ping
    /// loop). Pauses exactly like [`run`](Retry::run).
    pub fn until<X, R>(
        &self,
        ctx: &mut X,
        mut poll: impl FnMut(&mut X) -> Option<R>,
        mut pause: impl FnMut(&mut X, u32),
    ) -> R {
        loop {
            if let Some(found) = poll(ctx) {
                return found;
            }
            pause(ctx, self.delay_us);
        }
    }
}
