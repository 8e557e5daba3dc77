//! Constants used across the sensor link implementation.
//!
//! This module defines the compile-time configuration of the node: broker
//! identity, session limits, buffer sizing and the timing values used by the
//! polling loops of the [`LinkDriver`](crate::driver::LinkDriver).
//!
//! ## Key Concepts
//!
//! - **Identity**: the node publishes to `"<DEVICE_ID>/"` and subscribes to
//!   `"<DEVICE_ID>/CONFIG/"` on a single fixed broker.
//! - **Session limits**: bounds a configuration message must satisfy before a
//!   capture session is armed.
//! - **Payload limits**: the largest bulk publish the modem accepts, and the
//!   smaller batch size the drain path aims for.
//! - **Timing**: delays between polls of the modem byte stream. These were
//!   found experimentally against a modem running at 1.5 Mbaud; too fast
//!   misses replies, too slow wastes the cooperative loop.

/// Broker address used by the connect step of the handshake.
pub const BROKER_HOST: &str = "192.168.1.2";

/// Broker port used by the connect step of the handshake.
pub const BROKER_PORT: u16 = 1883;

/// Client identity announced to the broker and used as the topic root.
pub const DEVICE_ID: &str = "sensor1";

/// Keepalive timeout (seconds) configured on the modem's MQTT client.
pub const KEEPALIVE_SECONDS: u16 = 60;

/// Lowest accepted sample frequency (Hz) in a configuration message.
pub const MIN_SAMPLE_FREQUENCY_HZ: u32 = 1_000;

/// Highest accepted sample frequency (Hz) in a configuration message.
pub const MAX_SAMPLE_FREQUENCY_HZ: u32 = 2_000;

/// Longest accepted test length (seconds) in a configuration message.
pub const MAX_TEST_LENGTH_SECONDS: u32 = 30;

/// Maximum number of analog channels carried by a [`Sample`](crate::buffer::Sample).
pub const MAX_CHANNELS: u8 = 3;

/// See [`MAX_CHANNELS`](crate::consts::MAX_CHANNELS)
pub const MAX_CHANNELS_USIZE: usize = MAX_CHANNELS as usize;

/// Largest payload (in bytes) a single bulk publish may carry.
///
/// Longer payloads are clamped to this length before they are announced to
/// the modem.
pub const MAX_PUBLISH_BYTES: usize = 2_048;

/// Target size (in bytes) of one drained batch of samples.
///
/// Kept below [`MAX_PUBLISH_BYTES`] so a batch always fits in one publish.
pub const DRAIN_BATCH_BYTES: usize = 2_000;

/// Number of samples recorded between two drains in the blocking capture loop.
pub const DRAIN_EVERY_SAMPLES: u32 = 250;

/// Size of the line buffer used when reading modem output.
///
/// One byte is always left unused, so a line holds at most `LINE_CAPACITY - 1` bytes.
pub const LINE_CAPACITY: usize = 64;

/// Size of the buffer used to render a single AT command.
pub const COMMAND_CAPACITY: usize = 128;

/// Default ring buffer capacity, in samples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4_096;

/// Number of lines polled while waiting for a modem acknowledgement.
///
/// The wait gives up right after the last poll, without a final
/// [`ACK_RETRY_DELAY_MS`] pause. Older firmware read one extra line (76) and
/// paused after every miss; the budget here is one line and 5 ms shorter.
pub const ACK_ATTEMPTS: u32 = 75;

/// Delay between two acknowledgement polls, in milliseconds.
pub const ACK_RETRY_DELAY_MS: u32 = 5;

/// Delay between two bytes of the same line, in microseconds.
///
/// At 1.5 Mbaud one byte takes ~5.3 µs on the wire; 10 µs also covers 1 Mbaud.
pub const BYTE_SETTLE_US: u32 = 10;

/// Settle time after a modem reset, in milliseconds.
pub const RESET_SETTLE_MS: u32 = 3_000;

/// Cadence of the liveness ping, in milliseconds.
pub const PING_INTERVAL_MS: u32 = 1_000;

/// Time given to the collector to answer a ping, in milliseconds.
pub const PING_SETTLE_MS: u32 = 250;

/// Poll interval used while waiting for the session start second, in milliseconds.
pub const START_POLL_MS: u32 = 1;

/// Header of the time synchronization message.
pub const TIME_HEADER: &[u8; 4] = b"TIME";

/// Length of the time synchronization message (header + 4 time bytes).
pub const TIME_MESSAGE_LEN: usize = 8;

/// Microseconds per millisecond.
pub const US_PER_MS: u32 = 1_000;
