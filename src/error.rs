//! Error types for the link driver and the session configuration parser.
//!
//! None of these errors is fatal to the node. Link errors are either retried
//! (handshake) or logged and skipped (publish acknowledgements); configuration
//! errors are answered with a `FAIL` reply while the node keeps listening.

use thiserror::Error;

/// Failure of a modem-level operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkError {
    /// The underlying byte stream reported an error on read, write or flush.
    #[error("modem transport error")]
    Transport,
    /// The modem answered a command with its failure token (`ERROR\r`).
    #[error("modem rejected the command")]
    Nack,
    /// No recognizable acknowledgement arrived within the attempt budget.
    #[error("timed out waiting for a modem acknowledgement")]
    Timeout,
    /// A rendered command did not fit in the command buffer.
    #[error("command exceeds the command buffer")]
    CommandTooLong,
}

/// Rejection of an inbound configuration message.
///
/// The first three numeric variants carry the offending value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ConfigError {
    /// A comma-separated field is absent.
    #[error("configuration field `{0}` is missing")]
    MissingField(&'static str),
    /// A field is present but is not an unsigned decimal integer.
    #[error("configuration field `{0}` is not a number")]
    Malformed(&'static str),
    /// Sample frequency outside `MIN_SAMPLE_FREQUENCY_HZ..=MAX_SAMPLE_FREQUENCY_HZ`.
    #[error("sample frequency {0} Hz is out of range")]
    SampleFrequency(u32),
    /// Test length outside `1..=MAX_TEST_LENGTH_SECONDS`.
    #[error("test length {0} s is out of range")]
    TestLength(u32),
    /// Channel count outside `1..=MAX_CHANNELS`.
    #[error("channel count {0} is out of range")]
    Channels(u32),
}
