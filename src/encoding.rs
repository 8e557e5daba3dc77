//! Wire encodings for samples and time synchronization messages.
//!
//! This module holds the byte layouts the collector expects on the node's
//! publish topic. Both directions are provided so collectors written against
//! this crate decode exactly what the node encodes.
//!
//! ## Sample layout
//!
//! Every field is a big-endian `u16`. The timestamp and the first channel are
//! always present; the second and third channels are emitted only when the
//! configured channel count includes them:
//!
//! ```text
//! [ts_hi, ts_lo, ch1_hi, ch1_lo, (ch2_hi, ch2_lo), (ch3_hi, ch3_lo)]
//! ```
//!
//! so one sample occupies [`sample_stride`] = `2 + 2 * channels` bytes.
//!
//! ## Time message layout
//!
//! ```text
//! [b'T', b'I', b'M', b'E', s0, s1, s2, s3]
//! ```
//!
//! where `s0..s3` is the clock's seconds value in **little-endian** order,
//! the order the collector decodes (`s0` is the least significant byte).
//!
//! ## Limitations
//!
//! - Channel counts above [`MAX_CHANNELS`] are clamped to it
//! - Decoding never infers the channel count; it must be known from the session

use crate::buffer::Sample;
use crate::consts::{MAX_CHANNELS, TIME_HEADER, TIME_MESSAGE_LEN};

/// Number of bytes one encoded sample occupies for `channels` active channels.
pub const fn sample_stride(channels: u8) -> usize {
    let channels = if channels > MAX_CHANNELS {
        MAX_CHANNELS
    } else {
        channels
    };
    2 + 2 * channels as usize
}

/// Encodes `sample` into `output` using the layout described in the module docs.
///
/// # Arguments
/// - `sample` : The sample to encode
/// - `channels` : The active channel count of the session (`1..=3`)
/// - `output` : The output buffer, at least [`sample_stride`] bytes long
///
/// # Returns
/// The number of bytes written.
///
/// # Panics
/// Panics if `output` is shorter than `sample_stride(channels)`.
pub fn encode_sample(sample: &Sample, channels: u8, output: &mut [u8]) -> usize {
    let stride = sample_stride(channels);
    output[..2].copy_from_slice(&sample.timestamp.to_be_bytes());
    for (i, chunk) in output[2..stride].chunks_exact_mut(2).enumerate() {
        chunk.copy_from_slice(&sample.channels[i].to_be_bytes());
    }
    stride
}

/// Decodes one sample from the front of `input`.
///
/// Channels beyond `channels` are left at zero.
/// Returns `None` if `input` is shorter than [`sample_stride`].
pub fn decode_sample(input: &[u8], channels: u8) -> Option<Sample> {
    let stride = sample_stride(channels);
    let bytes = input.get(..stride)?;
    let mut sample = Sample {
        timestamp: u16::from_be_bytes([bytes[0], bytes[1]]),
        ..Sample::default()
    };
    for (i, chunk) in bytes[2..].chunks_exact(2).enumerate() {
        sample.channels[i] = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Some(sample)
}

/// Builds the 8-byte `TIME` message for `secs`.
pub fn encode_time(secs: u32) -> [u8; TIME_MESSAGE_LEN] {
    let mut message = [0u8; TIME_MESSAGE_LEN];
    message[..4].copy_from_slice(TIME_HEADER);
    message[4..].copy_from_slice(&secs.to_le_bytes());
    message
}

/// Extracts the seconds value from a `TIME` message.
///
/// Returns `None` if the header does not match or the message is truncated.
pub fn decode_time(message: &[u8]) -> Option<u32> {
    if message.get(..4)? != TIME_HEADER {
        return None;
    }
    let bytes = message.get(4..TIME_MESSAGE_LEN)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
