//! Capture-session configuration and state.
//!
//! A session is armed by a configuration message published by the collector
//! on the node's `CONFIG` topic:
//!
//! ```text
//! <testLengthSeconds>,<sampleFrequencyHz>,<numChannels>,<startTimeSeconds>
//! ```
//!
//! The modem prints every inbound application message as
//! `"<topic> -> <message>"`; [`parse_inbound`] strips that framing.

use core::str::FromStr;

use crate::consts::{
    MAX_CHANNELS, MAX_SAMPLE_FREQUENCY_HZ, MAX_TEST_LENGTH_SECONDS, MIN_SAMPLE_FREQUENCY_HZ,
};
use crate::error::ConfigError;

const MICROS_PER_SECOND: u32 = 1_000_000;

/// Separator the modem places between topic and message.
pub const TOPIC_SEPARATOR: &str = "->";

/// A validated configuration message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SessionConfig {
    /// Capture duration, in seconds (`1..=MAX_TEST_LENGTH_SECONDS`).
    pub test_length_seconds: u32,
    /// Sampling rate, in Hz (`MIN_SAMPLE_FREQUENCY_HZ..=MAX_SAMPLE_FREQUENCY_HZ`).
    pub sample_frequency_hz: u32,
    /// Active channel count (`1..=MAX_CHANNELS`).
    pub channels: u8,
    /// Absolute clock second at which capture should begin.
    pub start_time: u32,
}

impl SessionConfig {
    /// Parses and validates a configuration message body.
    ///
    /// Surrounding whitespace (including a trailing `\r`) around each field is
    /// ignored, as are fields past the fourth.
    pub fn parse(message: &str) -> Result<Self, ConfigError> {
        let mut fields = message.split(',');
        let test_length_seconds = next_field(&mut fields, "test length")?;
        let sample_frequency_hz = next_field(&mut fields, "sample frequency")?;
        let channels = next_field(&mut fields, "channels")?;
        let start_time = next_field(&mut fields, "start time")?;

        if !(MIN_SAMPLE_FREQUENCY_HZ..=MAX_SAMPLE_FREQUENCY_HZ).contains(&sample_frequency_hz) {
            return Err(ConfigError::SampleFrequency(sample_frequency_hz));
        }
        if !(1..=MAX_TEST_LENGTH_SECONDS).contains(&test_length_seconds) {
            return Err(ConfigError::TestLength(test_length_seconds));
        }
        if !(1..=u32::from(MAX_CHANNELS)).contains(&channels) {
            return Err(ConfigError::Channels(channels));
        }

        Ok(Self {
            test_length_seconds,
            sample_frequency_hz,
            channels: channels as u8,
            start_time,
        })
    }

    /// Sample period in microseconds, truncated (`1_000_000 / frequency`).
    pub fn sample_period_us(&self) -> u32 {
        MICROS_PER_SECOND / self.sample_frequency_hz
    }

    /// Test length in microseconds.
    pub fn test_length_us(&self) -> u32 {
        self.test_length_seconds * MICROS_PER_SECOND
    }
}

impl FromStr for SessionConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<u32, ConfigError> {
    let field = fields
        .next()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .ok_or(ConfigError::MissingField(name))?;
    field.parse().map_err(|_| ConfigError::Malformed(name))
}

/// Link/session state written by the configuration handshake.
///
/// Capture starts disabled. [`arm`](Self::arm) is only called by the driver
/// once a configuration has been validated; the sampling and drain
/// collaborators read the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SessionState {
    enabled: bool,
    sample_period_us: u32,
    test_length_us: u32,
    count: u32,
    start_time: u32,
    channels: u8,
}

impl SessionState {
    /// Creates a disarmed session.
    pub const fn new() -> Self {
        Self {
            enabled: false,
            sample_period_us: 0,
            test_length_us: 0,
            count: 0,
            start_time: 0,
            channels: 0,
        }
    }

    /// Arms capture for `config` and resets the sample count.
    pub fn arm(&mut self, config: &SessionConfig) {
        self.sample_period_us = config.sample_period_us();
        self.test_length_us = config.test_length_us();
        self.start_time = config.start_time;
        self.channels = config.channels;
        self.count = 0;
        self.enabled = true;
    }

    /// Disables capture. Parameters of the last session are kept.
    pub fn disarm(&mut self) {
        self.enabled = false;
    }

    /// Counts one more captured sample and returns the new count.
    pub fn record_sample(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Whether a capture session is armed.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured sample period, in microseconds.
    pub fn sample_period_us(&self) -> u32 {
        self.sample_period_us
    }

    /// Configured test length, in microseconds.
    pub fn test_length_us(&self) -> u32 {
        self.test_length_us
    }

    /// Samples captured since the session was armed.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Absolute clock second at which capture begins.
    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    /// Active channel count of the session.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Number of samples that make up the whole session.
    pub fn target_samples(&self) -> u32 {
        if self.sample_period_us == 0 {
            0
        } else {
            self.test_length_us / self.sample_period_us
        }
    }

    /// Whether the armed session has captured all of its samples.
    pub fn is_complete(&self) -> bool {
        self.enabled && self.count >= self.target_samples()
    }
}

/// An application message received on the subscribe topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Inbound<'a> {
    /// Liveness request from the collector.
    Ping,
    /// Liveness reply from the collector.
    Pong,
    /// Any other message body, trimmed.
    Message(&'a str),
}

/// Extracts the message part of a `"<topic> -> <message>"` line.
///
/// Returns `None` for lines that are not valid UTF-8, carry no separator, or
/// have nothing after it.
pub fn parse_inbound(line: &[u8]) -> Option<Inbound<'_>> {
    let text = core::str::from_utf8(line).ok()?;
    let (_topic, message) = text.split_once(TOPIC_SEPARATOR)?;
    let message = message.trim();
    if message.is_empty() {
        None
    } else if message.starts_with("ping") {
        Some(Inbound::Ping)
    } else if message.starts_with("pong") {
        Some(Inbound::Pong)
    } else {
        Some(Inbound::Message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = SessionConfig::parse("5,1500,2,1000").unwrap();
        assert_eq!(config.test_length_seconds, 5);
        assert_eq!(config.sample_frequency_hz, 1500);
        assert_eq!(config.channels, 2);
        assert_eq!(config.start_time, 1000);
        assert_eq!(config.sample_period_us(), 666);
        assert_eq!(config.test_length_us(), 5_000_000);
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_extra_fields() {
        let config: SessionConfig = " 30, 2000 ,3,42\r".parse().unwrap();
        assert_eq!(config.test_length_seconds, 30);
        assert_eq!(config.sample_frequency_hz, 2000);
        assert_eq!(config.channels, 3);
        assert_eq!(config.start_time, 42);
        assert!(SessionConfig::parse("1,1000,1,0,extra").is_ok());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(
            SessionConfig::parse("5,2500,2,1000"),
            Err(ConfigError::SampleFrequency(2500))
        );
        assert_eq!(
            SessionConfig::parse("5,999,2,1000"),
            Err(ConfigError::SampleFrequency(999))
        );
        assert_eq!(
            SessionConfig::parse("31,1500,2,1000"),
            Err(ConfigError::TestLength(31))
        );
        assert_eq!(
            SessionConfig::parse("0,1500,2,1000"),
            Err(ConfigError::TestLength(0))
        );
        assert_eq!(
            SessionConfig::parse("5,1500,4,1000"),
            Err(ConfigError::Channels(4))
        );
        assert_eq!(
            SessionConfig::parse("5,1500,0,1000"),
            Err(ConfigError::Channels(0))
        );
    }

    #[test]
    fn test_parse_rejects_missing_and_malformed_fields() {
        assert_eq!(
            SessionConfig::parse("5,1500,2"),
            Err(ConfigError::MissingField("start time"))
        );
        assert_eq!(
            SessionConfig::parse("5,,2,1000"),
            Err(ConfigError::MissingField("sample frequency"))
        );
        assert_eq!(
            SessionConfig::parse("5,fast,2,1000"),
            Err(ConfigError::Malformed("sample frequency"))
        );
        assert_eq!(
            SessionConfig::parse("-5,1500,2,1000"),
            Err(ConfigError::Malformed("test length"))
        );
    }

    #[test]
    fn test_session_state_lifecycle() {
        let mut state = SessionState::new();
        assert!(!state.is_enabled());
        assert!(!state.is_complete());

        let config = SessionConfig::parse("1,1000,1,7").unwrap();
        state.arm(&config);
        assert!(state.is_enabled());
        assert_eq!(state.sample_period_us(), 1000);
        assert_eq!(state.test_length_us(), 1_000_000);
        assert_eq!(state.target_samples(), 1000);
        assert_eq!(state.start_time(), 7);
        assert_eq!(state.channels(), 1);

        for _ in 0..999 {
            let _ = state.record_sample();
        }
        assert!(!state.is_complete());
        assert_eq!(state.record_sample(), 1000);
        assert!(state.is_complete());

        state.disarm();
        assert!(!state.is_enabled());
        assert!(!state.is_complete());

        state.arm(&config);
        assert_eq!(state.count(), 0);
    }

    #[test]
    fn test_parse_inbound_framing() {
        assert_eq!(
            parse_inbound(b"sensor1/CONFIG/ -> ping\r"),
            Some(Inbound::Ping)
        );
        assert_eq!(
            parse_inbound(b"sensor1/CONFIG/ -> pong\r"),
            Some(Inbound::Pong)
        );
        assert_eq!(
            parse_inbound(b"sensor1/CONFIG/ -> 5,1500,2,1000\r"),
            Some(Inbound::Message("5,1500,2,1000"))
        );
        assert_eq!(parse_inbound(b"OK\r"), None);
        assert_eq!(parse_inbound(b"sensor1/CONFIG/ -> \r"), None);
        assert_eq!(parse_inbound(b""), None);
        assert_eq!(parse_inbound(&[0xff, b'-', b'>', b'x']), None);
    }
}
