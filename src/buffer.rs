//! Fixed-capacity circular buffer of timestamped samples.
//!
//! The sampling collaborator pushes one [`Sample`] per sample period; the
//! drain collaborator pops batches that are already encoded for the wire
//! (see [`crate::encoding`]). The buffer is a single-producer,
//! single-consumer structure without internal locking. When the producer is
//! an interrupt handler, share it through the helpers in [`crate::timer`]
//! (feature `timer-isr`), which serialize every access in a critical section.
//!
//! ## Full/empty tracking
//!
//! `head == tail` holds both when the buffer is empty and when it is full, so
//! the buffer keeps explicit `full` and `empty` flags. No slot is reserved:
//! all `N` slots are usable.
//!
//! ## Failure semantics
//!
//! Neither a full buffer on push nor an empty buffer on pop is an error. Push
//! reports `false` and leaves the buffer untouched; pop returns fewer samples
//! than requested (possibly zero).

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::consts::{MAX_CHANNELS, MAX_CHANNELS_USIZE};
use crate::encoding::{encode_sample, sample_stride};

/// Owned byte buffer returned by [`SampleBuffer::pop`].
#[cfg(feature = "std")]
pub type Payload = Vec<u8>;

/// Byte capacity of a [`Payload`] without `std`.
///
/// This bounds how many samples one [`SampleBuffer::pop`] can return on
/// `no_std` targets: `PAYLOAD_CAPACITY / stride`.
#[cfg(not(feature = "std"))]
pub const PAYLOAD_CAPACITY: usize = crate::consts::MAX_PUBLISH_BYTES;

/// Owned byte buffer returned by [`SampleBuffer::pop`].
#[cfg(not(feature = "std"))]
pub type Payload = Vec<u8, PAYLOAD_CAPACITY>;

/// One reading per channel plus a 16-bit relative timestamp.
///
/// Room for [`MAX_CHANNELS`] readings is always reserved; how many of them are
/// meaningful is a property of the session, tracked by the [`SampleBuffer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Sample {
    /// Timestamp relative to the session start.
    pub timestamp: u16,
    /// Channel readings; slots past the active channel count are ignored.
    pub channels: [u16; MAX_CHANNELS_USIZE],
}

impl Sample {
    /// Creates a sample from a timestamp and all three channel slots.
    pub const fn new(timestamp: u16, channels: [u16; MAX_CHANNELS_USIZE]) -> Self {
        Self {
            timestamp,
            channels,
        }
    }

    /// Creates a sample from however many readings are available.
    ///
    /// Readings past [`MAX_CHANNELS`] are ignored; missing ones stay zero.
    pub fn from_readings(timestamp: u16, readings: &[u16]) -> Self {
        let mut channels = [0u16; MAX_CHANNELS_USIZE];
        for (slot, reading) in channels.iter_mut().zip(readings) {
            *slot = *reading;
        }
        Self {
            timestamp,
            channels,
        }
    }
}

/// Samples removed by [`SampleBuffer::pop`], already encoded for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    /// `count * stride` encoded bytes, oldest sample first.
    pub bytes: Payload,
    /// Number of samples actually removed.
    pub count: usize,
}

impl Drained {
    /// Returns `true` if no sample was removed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A circular store of up to `N` samples with FIFO semantics.
///
/// ## Example
///
/// ```rust
/// use sensorlink::buffer::{Sample, SampleBuffer};
///
/// let mut buffer: SampleBuffer<16> = SampleBuffer::new(2);
/// assert!(buffer.push(Sample::new(1, [2, 3, 4])));
///
/// let drained = buffer.pop(8);
/// assert_eq!(drained.count, 1);
/// assert_eq!(&drained.bytes[..], &[0x00, 0x01, 0x00, 0x02, 0x00, 0x03]);
/// ```
#[derive(Debug)]
pub struct SampleBuffer<const N: usize> {
    #[cfg(feature = "std")]
    storage: Vec<Sample>,
    #[cfg(not(feature = "std"))]
    storage: Vec<Sample, N>,
    head: usize,
    tail: usize,
    full: bool,
    empty: bool,
    channels: u8,
    stride: usize,
}

impl<const N: usize> SampleBuffer<N> {
    const NON_ZERO_CAPACITY: () = assert!(N > 0, "sample buffer capacity must be non-zero");

    /// Creates an empty buffer for `channels` active channels.
    pub fn new(channels: u8) -> Self {
        let () = Self::NON_ZERO_CAPACITY;
        let mut buffer = Self {
            storage: Vec::new(),
            head: 0,
            tail: 0,
            full: false,
            empty: true,
            channels: 1,
            stride: sample_stride(1),
        };
        buffer.reset(channels);
        buffer
    }

    /// Empties the buffer and reconfigures it for `channels` active channels.
    ///
    /// Every slot of the backing storage is overwritten with a default
    /// sample, in place. Channel counts outside `1..=MAX_CHANNELS` are clamped.
    /// Calling `reset` repeatedly with the same count always yields the same
    /// empty state.
    pub fn reset(&mut self, channels: u8) {
        self.full = false;
        self.empty = true;
        self.head = 0;
        self.tail = 0;
        self.channels = channels.clamp(1, MAX_CHANNELS);
        self.stride = sample_stride(self.channels);
        self.storage.clear();
        #[cfg(feature = "std")]
        self.storage.resize(N, Sample::default());
        #[cfg(not(feature = "std"))]
        let _ = self.storage.resize(N, Sample::default());
    }

    /// Appends `sample` at the head of the buffer.
    ///
    /// # Returns
    /// - `true`: the sample was stored
    /// - `false`: the buffer is full; nothing was modified
    pub fn push(&mut self, sample: Sample) -> bool {
        if self.full {
            warn!("sample buffer is full, dropping sample {}", sample.timestamp);
            return false;
        }

        self.storage[self.head] = sample;
        self.head = (self.head + 1) % N;
        if self.head == self.tail {
            self.full = true;
        }
        self.empty = false;
        true
    }

    /// Removes up to `count` samples, oldest first, encoding each one as it is
    /// removed.
    ///
    /// Stops early once the buffer is empty; the returned [`Drained::count`]
    /// reports exactly how many samples were removed.
    ///
    /// Without `std` the encoded bytes live in a fixed [`Payload`] of
    /// `PAYLOAD_CAPACITY` bytes, so at most [`max_batch`](Self::max_batch)
    /// samples are removed per call; the rest stay buffered.
    pub fn pop(&mut self, count: usize) -> Drained {
        let count = count.min(self.len()).min(self.max_batch());
        let mut bytes = Payload::new();
        let _ = bytes.resize(count * self.stride, 0);

        let mut popped = 0;
        while popped < count && !self.empty {
            let offset = popped * self.stride;
            let _ = encode_sample(
                &self.storage[self.tail],
                self.channels,
                &mut bytes[offset..offset + self.stride],
            );
            self.tail = (self.tail + 1) % N;
            if self.tail == self.head {
                self.empty = true;
            }
            popped += 1;
        }

        if popped > 0 {
            self.full = false;
        }
        bytes.truncate(popped * self.stride);
        Drained {
            bytes,
            count: popped,
        }
    }

    /// Number of samples currently stored.
    pub fn len(&self) -> usize {
        if self.full {
            N
        } else {
            (self.head + N - self.tail) % N
        }
    }

    /// Returns `true` if no sample is stored.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Returns `true` if a push would be rejected.
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Total number of samples the buffer can hold.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Active channel count, as set by the last [`reset`](Self::reset).
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Encoded size of one sample, in bytes (`2 + 2 * channels`).
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Largest number of samples a single [`pop`](Self::pop) can encode.
    ///
    /// Unbounded with `std`; `PAYLOAD_CAPACITY / stride` otherwise.
    pub fn max_batch(&self) -> usize {
        #[cfg(feature = "std")]
        {
            usize::MAX
        }
        #[cfg(not(feature = "std"))]
        {
            PAYLOAD_CAPACITY / self.stride
        }
    }
}
