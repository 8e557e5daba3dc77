//! A sensor node: one link driver plus one sample buffer.
//!
//! [`SensorNode`] wires the data flow together: samples pushed into the
//! [`SampleBuffer`] are popped in batches, encoded, and published through the
//! [`LinkDriver`]. It does not decide *when* to sample or drain; that stays
//! with the caller's control loop (or [`crate::timer::run_capture_loop`]).

use embedded_hal::delay::DelayNs;

use crate::buffer::{Sample, SampleBuffer};
use crate::clock::Clock;
use crate::consts::{DRAIN_BATCH_BYTES, START_POLL_MS};
use crate::driver::LinkDriver;
use crate::session::SessionConfig;
use crate::timer::Retry;
use crate::transport::ModemTransport;

/// Link driver and sample buffer of one node.
#[derive(Debug)]
pub struct SensorNode<T, D, C, const N: usize>
where
    T: ModemTransport,
    D: DelayNs,
    C: Clock,
{
    /// The modem protocol engine.
    pub link: LinkDriver<T, D, C>,
    /// Samples waiting to be drained.
    pub buffer: SampleBuffer<N>,
    /// Samples lost because the buffer was full.
    pub dropped: u32,
}

impl<T, D, C, const N: usize> SensorNode<T, D, C, N>
where
    T: ModemTransport,
    D: DelayNs,
    C: Clock,
{
    /// Creates a node with a single-channel buffer.
    pub fn new(link: LinkDriver<T, D, C>) -> Self {
        Self {
            link,
            buffer: SampleBuffer::new(1),
            dropped: 0,
        }
    }

    /// Connects to the broker, then waits for the collector to answer a ping.
    pub fn connect(&mut self) {
        self.link.handshake();
        self.link.ping_loop();
    }

    /// Waits for a valid configuration and prepares the buffer for it.
    pub fn start_session(&mut self) -> SessionConfig {
        let config = self.link.await_config();
        self.buffer.reset(config.channels);
        config
    }

    /// Like [`start_session`](Self::start_session), bounded by `retry`.
    pub fn try_start_session(&mut self, retry: Retry) -> Option<SessionConfig> {
        let config = self.link.try_await_config(retry)?;
        self.buffer.reset(config.channels);
        Some(config)
    }

    /// Polls the clock until the session's start second.
    pub fn wait_for_start(&mut self) {
        let start = self.link.session().start_time();
        while self.link.clock.secs() < start {
            self.link.delay.delay_ms(START_POLL_MS);
        }
    }

    /// Counts one sample and stores it.
    ///
    /// Returns `false` if no session is armed (the sample is ignored and not
    /// counted) or if the buffer was full and the sample was dropped; a
    /// dropped sample still counts towards the session length.
    pub fn record(&mut self, sample: Sample) -> bool {
        if !self.link.session().is_enabled() {
            trace!("ignoring sample {} outside a session", sample.timestamp);
            return false;
        }
        let _ = self.link.record_sample();
        let stored = self.buffer.push(sample);
        if !stored {
            self.dropped = self.dropped.saturating_add(1);
        }
        stored
    }

    /// Publishes at most one batch of buffered samples.
    ///
    /// Returns the number of samples drained; nothing is published when the
    /// buffer is empty.
    pub fn drain(&mut self) -> usize {
        let batch = DRAIN_BATCH_BYTES / self.buffer.stride();
        let drained = self.buffer.pop(batch);
        if drained.is_empty() {
            return 0;
        }
        trace!("draining {} samples", drained.count);
        let _ = self.link.publish(&drained.bytes);
        drained.count
    }

    /// Drains everything left, then ends the session.
    ///
    /// Returns the number of samples drained by this call.
    pub fn finish_session(&mut self) -> usize {
        let mut total = 0;
        loop {
            let drained = self.drain();
            if drained == 0 {
                break;
            }
            total += drained;
        }
        let _ = self.link.end_session();
        total
    }

    /// Whether the armed session has captured all of its samples.
    pub fn capture_complete(&self) -> bool {
        self.link.session().is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::driver::LinkMode;
    use crate::testing::{ManualClock, ScriptedModem};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    type TestNode<const N: usize> = SensorNode<ScriptedModem, NoopDelay, ManualClock, N>;

    fn node<const N: usize>(modem: ScriptedModem, clock: ManualClock) -> TestNode<N> {
        SensorNode::new(LinkDriver::new(
            modem,
            NoopDelay::new(),
            clock,
            LinkConfig::default(),
        ))
    }

    fn armed<const N: usize>(config: &[u8]) -> TestNode<N> {
        let mut node = node(ScriptedModem::new(), ManualClock::at(0));
        node.link.transport.push_inbound(config);
        let _ = node.try_start_session(Retry::bounded(1, 0));
        node
    }

    #[test]
    fn test_start_session_resets_buffer() {
        let mut node: TestNode<8> = armed(b"sensor1/CONFIG/ -> 1,1000,3,0\r\n");
        assert_eq!(node.buffer.channels(), 3);
        assert_eq!(node.buffer.stride(), 8);
        assert_eq!(node.link.mode, LinkMode::Capturing);
        assert!(node.record(Sample::new(0x0001, [0x0102, 0x0304, 0x0506])));
        assert_eq!(node.drain(), 1);
        assert_eq!(
            node.link.transport.written()[3],
            b"\x00\x01\x01\x02\x03\x04\x05\x06\r\n"
        );
    }

    #[test]
    fn test_record_counts_dropped_samples() {
        let mut node: TestNode<2> = armed(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        assert!(node.record(Sample::default()));
        assert!(node.record(Sample::default()));
        assert!(!node.record(Sample::default()));
        assert_eq!(node.dropped, 1);
        assert_eq!(node.link.session().count(), 3);
    }

    #[test]
    fn test_record_ignored_without_session() {
        let mut node: TestNode<4> = node(ScriptedModem::new(), ManualClock::at(0));
        assert!(!node.record(Sample::new(1, [2, 3, 4])));
        assert_eq!(node.link.session().count(), 0);
        assert!(node.buffer.is_empty());
        assert_eq!(node.dropped, 0);

        let mut node: TestNode<4> = armed(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        let _ = node.finish_session();
        assert!(!node.record(Sample::default()));
        assert!(node.buffer.is_empty());
    }

    #[test]
    fn test_drain_empty_publishes_nothing() {
        let mut node: TestNode<4> = node(ScriptedModem::new(), ManualClock::at(0));
        assert_eq!(node.drain(), 0);
        assert!(node.link.transport.written().is_empty());
    }

    #[test]
    fn test_drain_respects_batch_size() {
        // one channel: 4-byte stride, 500 samples per batch
        let mut node: TestNode<1024> = armed(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        for t in 0..600u16 {
            assert!(node.record(Sample::new(t, [t, 0, 0])));
        }
        assert_eq!(node.drain(), 500);
        assert_eq!(node.buffer.len(), 100);
        let lines = node.link.transport.lines();
        assert_eq!(lines[2], "AT+MQTTPUBSEND=2000");
    }

    #[test]
    fn test_finish_session_drains_then_ends() {
        let mut node: TestNode<1024> = armed(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        for t in 0..600u16 {
            let _ = node.record(Sample::new(t, [t, 0, 0]));
        }
        assert_eq!(node.finish_session(), 600);
        assert!(node.buffer.is_empty());
        assert!(!node.link.session().is_enabled());
        assert_eq!(node.link.mode, LinkMode::AwaitingConfig);
        let lines = node.link.transport.lines();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[2], "AT+MQTTPUBSEND=2000");
        assert_eq!(lines[4], "AT+MQTTPUBSEND=400");
        assert_eq!(lines[6], "AT+MQTTPUBSEND=3");
        assert_eq!(lines[7], "END");
    }

    #[test]
    fn test_wait_for_start_polls_clock() {
        let mut node: TestNode<4> = node(ScriptedModem::new(), ManualClock::ticking(0, 100));
        node.link
            .transport
            .push_inbound(b"sensor1/CONFIG/ -> 1,1000,1,3\r\n");
        let _ = node.try_start_session(Retry::bounded(1, 0));
        node.wait_for_start();
        assert!(node.link.clock.now_ms >= 3_000);
    }

    #[test]
    fn test_capture_complete_after_target() {
        let mut node: TestNode<1024> = armed(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        for _ in 0..999 {
            let _ = node.record(Sample::default());
        }
        assert!(!node.capture_complete());
        let _ = node.record(Sample::default());
        assert!(node.capture_complete());
    }
}
