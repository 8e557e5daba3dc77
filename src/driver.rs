//! AT-command protocol engine for the node's radio modem.
//!
//! This module provides [`LinkDriver`], which turns the modem's unreliable,
//! latency-variable byte stream into a request/acknowledge protocol: the
//! broker handshake, two-phase bulk publishes, the configuration wait that
//! arms a capture session, the liveness ping and time synchronization.
//!
//! The driver owns three capabilities, all passed in at construction:
//! - a [`ModemTransport`] (the serial byte stream),
//! - an [`embedded_hal::delay::DelayNs`] used by every polling loop,
//! - a [`Clock`] read for the `TIME` message.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sensorlink::config::LinkConfig;
//! use sensorlink::driver::LinkDriver;
//!
//! let mut link = LinkDriver::new(uart, delay, rtc, LinkConfig::default());
//! link.handshake(); // retries until the broker accepts us
//! link.ping_loop(); // until the collector answers
//! let session = link.await_config();
//! ```
//!
//! ## Failure semantics
//!
//! Nothing here is fatal. Handshake failures reset the modem and start over;
//! missing publish acknowledgements are logged and reported in a
//! [`PublishReport`]; rejected configurations are answered with `FAIL`.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::clock::Clock;
use crate::command::{Ack, Command, classify_ack};
use crate::config::LinkConfig;
use crate::consts::{LINE_CAPACITY, MAX_PUBLISH_BYTES, PING_SETTLE_MS, RESET_SETTLE_MS};
use crate::encoding::encode_time;
use crate::error::LinkError;
use crate::session::{Inbound, SessionConfig, SessionState, parse_inbound};
use crate::timer::Retry;
use crate::transport::ModemTransport;

/// Liveness request published by the node.
pub const PING: &[u8] = b"ping";
/// Liveness reply published by the node.
pub const PONG: &[u8] = b"pong";
/// Reply to an accepted configuration.
pub const START: &[u8] = b"START";
/// Reply to a rejected configuration.
pub const FAIL: &[u8] = b"FAIL";
/// Published once the last batch of a session has been drained.
pub const END: &[u8] = b"END";

const LINE_END: &[u8] = b"\r\n";

/// One line of modem output.
///
/// Holds at most `LINE_CAPACITY - 1` bytes; a terminating `\r` is kept.
pub type Line = Vec<u8, LINE_CAPACITY>;

/// Operational mode of the [`LinkDriver`].
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkMode {
    /// Freshly constructed; the modem has not been configured.
    #[default]
    Uninitialized,
    /// Running the identity/topics/connect sequence.
    Handshaking,
    /// Connected, listening for a configuration message.
    AwaitingConfig,
    /// A session is armed; samples are being captured and drained.
    Capturing,
}

/// Outcome of [`LinkDriver::publish`].
///
/// Delivery is at most once and unconfirmed: the payload is sent even when
/// the announcement was not acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PublishReport {
    /// Number of bytes announced and sent.
    pub len: usize,
    /// Whether the payload was clamped to [`MAX_PUBLISH_BYTES`].
    pub truncated: bool,
    /// Result of the `AT+MQTTPUBSEND` announcement.
    pub announce: Result<(), LinkError>,
    /// Result of sending the payload itself.
    pub payload: Result<(), LinkError>,
}

impl PublishReport {
    /// Returns `true` if both phases were acknowledged.
    pub fn acknowledged(&self) -> bool {
        self.announce.is_ok() && self.payload.is_ok()
    }
}

/// A command/response driver for an AT-style MQTT modem.
///
/// ## Type Parameters
///
/// - `T`: the modem byte stream, see [`ModemTransport`]
/// - `D`: a delay provider implementing [`DelayNs`]
/// - `C`: the node's real-time clock, see [`Clock`]
///
/// ## Notes
///
/// - Every wait is a poll loop; a call monopolizes the node until it returns.
/// - Callers must not read or write `transport` while an operation is running.
#[derive(Debug)]
pub struct LinkDriver<T, D, C>
where
    T: ModemTransport,
    D: DelayNs,
    C: Clock,
{
    /// The current mode of the driver.
    pub mode: LinkMode,
    /// The modem byte stream.
    pub transport: T,
    /// Delay provider used between polls.
    pub delay: D,
    /// The node's clock.
    pub clock: C,
    /// Number of handshake passes that ended in a modem reset.
    pub handshake_failures: u16,
    /// Number of publish phases that were not acknowledged.
    pub missed_acks: u16,
    /// Number of configuration messages answered with `FAIL`.
    pub rejected_configs: u16,
    config: LinkConfig,
    session: SessionState,
    ack_retry: Retry,
}

impl<T, D, C> LinkDriver<T, D, C>
where
    T: ModemTransport,
    D: DelayNs,
    C: Clock,
{
    /// Creates a driver in [`LinkMode::Uninitialized`] with capture disabled.
    pub fn new(transport: T, delay: D, clock: C, config: LinkConfig) -> Self {
        Self {
            mode: LinkMode::default(),
            transport,
            delay,
            clock,
            handshake_failures: 0,
            missed_acks: 0,
            rejected_configs: 0,
            config,
            session: SessionState::new(),
            ack_retry: Retry::ACK,
        }
    }

    /// Replaces the acknowledgement polling policy.
    pub fn with_ack_retry(mut self, retry: Retry) -> Self {
        self.ack_retry = retry;
        self
    }

    /// The identity and broker settings.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// The session state written by [`await_config`](Self::await_config).
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Counts one captured sample; returns the new count.
    pub fn record_sample(&mut self) -> u32 {
        self.session.record_sample()
    }

    /// Configures the modem and connects to the broker.
    ///
    /// Issues identity, topics and connect in order, each followed by an
    /// acknowledgement wait. Any failure resets the modem and restarts from
    /// the identity step. Returns only once all three succeed in one pass.
    pub fn handshake(&mut self) {
        self.mode = LinkMode::Handshaking;
        while let Err(_e) = self.try_handshake() {
            warn!("handshake failed, resetting modem");
            self.handshake_failures = self.handshake_failures.wrapping_add(1);
            self.reset_modem();
        }
        info!("connected to broker as {}", self.config.device_id);
        self.mode = LinkMode::AwaitingConfig;
    }

    /// Runs a single handshake pass without resetting on failure.
    pub fn try_handshake(&mut self) -> Result<(), LinkError> {
        let config = self.config;
        let steps = [
            Command::SetIdentity {
                client_id: config.device_id,
                keepalive_seconds: config.keepalive_seconds,
            },
            Command::SetTopics {
                device_id: config.device_id,
            },
            Command::Connect {
                host: config.broker_host,
                port: config.broker_port,
            },
        ];
        for step in steps {
            self.execute(step)?;
            debug!("{} acknowledged", step.name());
        }
        Ok(())
    }

    /// Sends `command` and waits for its acknowledgement.
    pub fn execute(&mut self, command: Command<'_>) -> Result<(), LinkError> {
        let line = command.render()?;
        self.send_line(line.as_bytes())?;
        self.wait_ack()
    }

    /// Hard-resets the modem and waits for it to settle.
    ///
    /// No acknowledgement is awaited.
    pub fn reset_modem(&mut self) {
        match Command::Reset.render() {
            Ok(line) => {
                if self.send_line(line.as_bytes()).is_err() {
                    error!("failed to send modem reset");
                }
            }
            Err(_e) => error!("failed to render modem reset"),
        }
        self.delay.delay_ms(RESET_SETTLE_MS);
    }

    /// Publishes `payload` on the node's topic.
    ///
    /// Payloads longer than [`MAX_PUBLISH_BYTES`] are clamped. The length is
    /// announced, then the bytes are sent; each phase waits for an
    /// acknowledgement, but a missing one is only logged.
    pub fn publish(&mut self, payload: &[u8]) -> PublishReport {
        let truncated = payload.len() > MAX_PUBLISH_BYTES;
        let len = payload.len().min(MAX_PUBLISH_BYTES);
        if truncated {
            error!(
                "publish of {} bytes exceeds {}, truncating",
                payload.len(),
                MAX_PUBLISH_BYTES
            );
        }

        let announce = self.execute(Command::PublishBulk { len });
        if announce.is_err() {
            warn!("publish announcement of {} bytes not acknowledged", len);
            self.missed_acks = self.missed_acks.wrapping_add(1);
        }

        let sent = self
            .send_line(&payload[..len])
            .and_then(|()| self.wait_ack());
        if sent.is_err() {
            warn!("publish payload of {} bytes not acknowledged", len);
            self.missed_acks = self.missed_acks.wrapping_add(1);
        }

        PublishReport {
            len,
            truncated,
            announce,
            payload: sent,
        }
    }

    /// Waits for an acknowledgement line.
    ///
    /// # Errors
    /// - [`LinkError::Nack`] on `ERROR\r`
    /// - [`LinkError::Timeout`] once the attempt budget is spent
    pub fn wait_ack(&mut self) -> Result<(), LinkError> {
        let retry = self.ack_retry;
        match retry.run(self, |link| classify_ack(&link.read_line()), Self::pause_us) {
            Some(Ack::Ok) => Ok(()),
            Some(Ack::Error) => Err(LinkError::Nack),
            None => Err(LinkError::Timeout),
        }
    }

    /// Reads one line of modem output.
    ///
    /// Stops after a `\r` (kept), when the line is full, or as soon as no
    /// byte is available. `\n` is dropped. Returns an empty line if nothing
    /// was available to begin with.
    pub fn read_line(&mut self) -> Line {
        let mut line = Line::new();
        let _ = Retry::LINE_SETTLE.run(
            self,
            |link| match link.transport.read_byte() {
                Ok(b'\n') => None,
                Ok(byte) => {
                    let _ = line.push(byte);
                    (byte == b'\r' || line.len() >= LINE_CAPACITY - 1).then_some(())
                }
                Err(nb::Error::WouldBlock) => Some(()),
                Err(nb::Error::Other(_)) => {
                    warn!("modem read error");
                    Some(())
                }
            },
            Self::pause_us,
        );
        line
    }

    /// Listens until a valid configuration message arrives.
    ///
    /// Answers `ping` with `pong` and a time message, ignores messages that
    /// contain no comma, replies `FAIL` to invalid configurations. On
    /// success replies `START`, arms the session and enters
    /// [`LinkMode::Capturing`].
    pub fn await_config(&mut self) -> SessionConfig {
        self.mode = LinkMode::AwaitingConfig;
        Retry::CONFIG.until(self, Self::poll_config, Self::pause_us)
    }

    /// Like [`await_config`](Self::await_config), but gives up when `retry`
    /// runs out of attempts.
    pub fn try_await_config(&mut self, retry: Retry) -> Option<SessionConfig> {
        self.mode = LinkMode::AwaitingConfig;
        retry.run(self, Self::poll_config, Self::pause_us)
    }

    fn poll_config(&mut self) -> Option<SessionConfig> {
        let line = self.read_line();
        let message = match parse_inbound(&line)? {
            Inbound::Ping => {
                self.answer_ping();
                return None;
            }
            Inbound::Pong => return None,
            Inbound::Message(message) => message,
        };
        if !message.contains(',') {
            debug!("ignoring message without fields: {}", message);
            return None;
        }

        match SessionConfig::parse(message) {
            Ok(config) => {
                info!(
                    "session accepted: {} s at {} Hz on {} channels",
                    config.test_length_seconds,
                    config.sample_frequency_hz,
                    config.channels
                );
                let _ = self.publish(START);
                self.session.arm(&config);
                self.mode = LinkMode::Capturing;
                Some(config)
            }
            Err(_e) => {
                warn!("rejecting configuration: {}", message);
                self.rejected_configs = self.rejected_configs.wrapping_add(1);
                let _ = self.publish(FAIL);
                None
            }
        }
    }

    /// Pings the collector until it answers, then sends the time.
    pub fn ping_loop(&mut self) {
        Retry::PING.until(self, Self::ping_once, Self::pause_us);
        self.on_pong();
    }

    /// Pings the collector until it answers or `retry` runs out of
    /// attempts. The time is sent on success.
    pub fn try_ping(&mut self, retry: Retry) -> bool {
        let answered = retry.run(self, Self::ping_once, Self::pause_us).is_some();
        if answered {
            self.on_pong();
        }
        answered
    }

    fn ping_once(&mut self) -> Option<()> {
        let _ = self.publish(PING);
        self.delay.delay_ms(PING_SETTLE_MS);
        let line = self.read_line();
        (parse_inbound(&line) == Some(Inbound::Pong)).then_some(())
    }

    fn on_pong(&mut self) {
        info!("collector answered ping");
        let _ = self.send_time();
    }

    /// Publishes `TIME` followed by the clock's seconds, little-endian.
    pub fn send_time(&mut self) -> PublishReport {
        let secs = self.clock.secs();
        trace!("sending time {}", secs);
        self.publish(&encode_time(secs))
    }

    /// Ends the capture session: publishes `END`, disarms capture and goes
    /// back to listening for a configuration.
    pub fn end_session(&mut self) -> PublishReport {
        let report = self.publish(END);
        info!("session ended after {} samples", self.session.count());
        self.session.disarm();
        self.mode = LinkMode::AwaitingConfig;
        report
    }

    fn answer_ping(&mut self) {
        debug!("answering ping");
        let _ = self.publish(PONG);
        let _ = self.send_time();
    }

    fn send_line(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.transport
            .write_all(bytes)
            .and_then(|()| self.transport.write_all(LINE_END))
            .and_then(|()| self.transport.flush())
            .map_err(|_| LinkError::Transport)
    }

    fn pause_us(&mut self, us: u32) {
        if us > 0 {
            self.delay.delay_us(us);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, ScriptedModem};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    const OK: &str = "OK\r\n";

    fn driver(modem: ScriptedModem) -> LinkDriver<ScriptedModem, NoopDelay, ManualClock> {
        LinkDriver::new(
            modem,
            NoopDelay::new(),
            ManualClock::at(1_234),
            LinkConfig::default(),
        )
    }

    #[test]
    fn test_driver_initialization() {
        let link = driver(ScriptedModem::new());
        assert_eq!(link.mode, LinkMode::Uninitialized);
        assert!(!link.session().is_enabled());
        assert!(link.transport.lines().is_empty());
    }

    #[test]
    fn test_wait_ack_accepts_lone_o() {
        let mut link = driver(ScriptedModem::new());
        link.transport.push_inbound(b"O\r");
        assert_eq!(link.wait_ack(), Ok(()));
    }

    #[test]
    fn test_wait_ack_reports_error_token() {
        let mut link = driver(ScriptedModem::new());
        link.transport.push_inbound(b"ERROR\r\n");
        assert_eq!(link.wait_ack(), Err(LinkError::Nack));
    }

    #[test]
    fn test_wait_ack_times_out_on_silence() {
        let mut link = driver(ScriptedModem::new());
        assert_eq!(link.wait_ack(), Err(LinkError::Timeout));
        assert_eq!(link.transport.reads_attempted(), 75);
    }

    #[test]
    fn test_wait_ack_skips_unrelated_lines() {
        let mut link = driver(ScriptedModem::new());
        link.transport
            .push_inbound(b"\r\nsensor1/CONFIG/ -> hello\r\nOK\r\n");
        assert_eq!(link.wait_ack(), Ok(()));
    }

    #[test]
    fn test_read_line_framing() {
        let mut link = driver(ScriptedModem::new());
        assert!(link.read_line().is_empty());

        link.transport.push_inbound(b"\nab\ncd\rrest");
        assert_eq!(&link.read_line()[..], b"abcd\r");
        assert_eq!(&link.read_line()[..], b"rest");
        assert!(link.read_line().is_empty());
    }

    #[test]
    fn test_read_line_stops_before_capacity() {
        let mut link = driver(ScriptedModem::new());
        link.transport.push_inbound(&[b'x'; 100]);
        let first = link.read_line();
        assert_eq!(first.len(), LINE_CAPACITY - 1);
        let second = link.read_line();
        assert_eq!(second.len(), 100 - (LINE_CAPACITY - 1));
    }

    #[test]
    fn test_handshake_happy_path() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK, OK]));
        link.handshake();
        assert_eq!(link.mode, LinkMode::AwaitingConfig);
        assert_eq!(link.handshake_failures, 0);
        assert_eq!(
            link.transport.lines(),
            [
                "AT+MQTTSET=\"\",\"\",\"sensor1\",60",
                "AT+MQTTTOPIC=\"sensor1/\",\"sensor1/CONFIG/\"",
                "AT+MQTTCON=0,\"192.168.1.2\",1883",
            ]
        );
    }

    #[test]
    fn test_handshake_restarts_after_topic_timeout() {
        // identity ok, topics silent, reset (no ack), then a clean pass
        let mut link = driver(ScriptedModem::with_replies(&[OK, "", "", OK, OK, OK]));
        link.handshake();
        assert_eq!(link.handshake_failures, 1);
        assert_eq!(
            link.transport.lines(),
            [
                "AT+MQTTSET=\"\",\"\",\"sensor1\",60",
                "AT+MQTTTOPIC=\"sensor1/\",\"sensor1/CONFIG/\"",
                "AT+RST",
                "AT+MQTTSET=\"\",\"\",\"sensor1\",60",
                "AT+MQTTTOPIC=\"sensor1/\",\"sensor1/CONFIG/\"",
                "AT+MQTTCON=0,\"192.168.1.2\",1883",
            ]
        );
    }

    #[test]
    fn test_handshake_restarts_after_nack() {
        let mut link = driver(ScriptedModem::with_replies(&[
            "ERROR\r\n", "", OK, OK, OK,
        ]));
        link.handshake();
        assert_eq!(link.handshake_failures, 1);
        let lines = link.transport.lines();
        assert_eq!(lines[1], "AT+RST");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_publish_two_phases() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK]));
        let report = link.publish(b"abc");
        assert!(report.acknowledged());
        assert!(!report.truncated);
        assert_eq!(report.len, 3);
        assert_eq!(link.transport.lines(), ["AT+MQTTPUBSEND=3", "abc"]);
    }

    #[test]
    fn test_publish_without_acks_still_sends_payload() {
        let mut link = driver(ScriptedModem::new());
        let report = link.publish(b"abc");
        assert_eq!(report.announce, Err(LinkError::Timeout));
        assert_eq!(report.payload, Err(LinkError::Timeout));
        assert_eq!(link.missed_acks, 2);
        assert_eq!(link.transport.lines(), ["AT+MQTTPUBSEND=3", "abc"]);
    }

    #[test]
    fn test_publish_clamps_oversized_payload() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK]));
        let payload = [0x55u8; MAX_PUBLISH_BYTES + 10];
        let report = link.publish(&payload);
        assert!(report.truncated);
        assert_eq!(report.len, MAX_PUBLISH_BYTES);
        let written = link.transport.written();
        assert_eq!(written[0], b"AT+MQTTPUBSEND=2048\r\n");
        assert_eq!(written[1].len(), MAX_PUBLISH_BYTES + 2);
    }

    #[test]
    fn test_publish_reports_transport_failure() {
        let mut link = driver(ScriptedModem::new());
        link.transport.broken = true;
        let report = link.publish(b"abc");
        assert_eq!(report.announce, Err(LinkError::Transport));
        assert_eq!(report.payload, Err(LinkError::Transport));
    }

    #[test]
    fn test_send_time_little_endian() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK]));
        let report = link.send_time();
        assert!(report.acknowledged());
        let written = link.transport.written();
        assert_eq!(written[0], b"AT+MQTTPUBSEND=8\r\n");
        assert_eq!(written[1], b"TIME\xd2\x04\x00\x00\r\n");
    }

    #[test]
    fn test_await_config_accepts_valid_message() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK]));
        link.transport
            .push_inbound(b"sensor1/CONFIG/ -> 5,1500,2,1000\r\n");
        let config = link.await_config();
        assert_eq!(config.sample_period_us(), 666);
        assert_eq!(link.mode, LinkMode::Capturing);
        assert!(link.session().is_enabled());
        assert_eq!(link.session().sample_period_us(), 666);
        assert_eq!(link.session().test_length_us(), 5_000_000);
        assert_eq!(link.session().start_time(), 1000);
        assert_eq!(link.transport.lines(), ["AT+MQTTPUBSEND=5", "START"]);
    }

    #[test]
    fn test_await_config_rejects_out_of_range() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK]));
        link.transport
            .push_inbound(b"sensor1/CONFIG/ -> 5,2500,2,1000\r\n");
        assert_eq!(link.try_await_config(Retry::bounded(3, 0)), None);
        assert!(!link.session().is_enabled());
        assert_eq!(link.mode, LinkMode::AwaitingConfig);
        assert_eq!(link.rejected_configs, 1);
        assert_eq!(link.transport.lines(), ["AT+MQTTPUBSEND=4", "FAIL"]);
    }

    #[test]
    fn test_await_config_keeps_listening_after_fail() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK, OK, OK]));
        link.transport.push_inbound(
            b"sensor1/CONFIG/ -> 5,1500,9,1000\r\nsensor1/CONFIG/ -> 1,1000,1,7\r\n",
        );
        let config = link.await_config();
        assert_eq!(config.channels, 1);
        assert_eq!(link.rejected_configs, 1);
        assert_eq!(
            link.transport.lines(),
            ["AT+MQTTPUBSEND=4", "FAIL", "AT+MQTTPUBSEND=5", "START"]
        );
    }

    #[test]
    fn test_await_config_answers_ping_and_ignores_plain_text() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK, OK, OK, OK, OK]));
        link.transport.push_inbound(
            b"sensor1/CONFIG/ -> hello\r\nsensor1/CONFIG/ -> ping\r\nsensor1/CONFIG/ -> 2,2000,3,50\r\n",
        );
        let config = link.await_config();
        assert_eq!(config.channels, 3);
        let lines = link.transport.lines();
        assert_eq!(lines[0], "AT+MQTTPUBSEND=4");
        assert_eq!(lines[1], "pong");
        assert_eq!(lines[2], "AT+MQTTPUBSEND=8");
        assert_eq!(lines[4], "AT+MQTTPUBSEND=5");
        assert_eq!(lines[5], "START");
    }

    #[test]
    fn test_ping_loop_sends_time_on_pong() {
        let mut link = driver(ScriptedModem::with_replies(&[
            OK,
            "OK\r\nsensor1/CONFIG/ -> pong\r\n",
            OK,
            OK,
        ]));
        link.ping_loop();
        let lines = link.transport.lines();
        assert_eq!(lines[..2], ["AT+MQTTPUBSEND=4", "ping"]);
        assert_eq!(lines[2], "AT+MQTTPUBSEND=8");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_try_ping_gives_up() {
        let mut link = driver(ScriptedModem::new());
        assert!(!link.try_ping(Retry::bounded(2, 0)));
        assert_eq!(
            link.transport.lines(),
            ["AT+MQTTPUBSEND=4", "ping", "AT+MQTTPUBSEND=4", "ping"]
        );
    }

    #[test]
    fn test_end_session_publishes_end_and_disarms() {
        let mut link = driver(ScriptedModem::with_replies(&[OK, OK, OK, OK]));
        link.transport
            .push_inbound(b"sensor1/CONFIG/ -> 1,1000,1,0\r\n");
        let _ = link.await_config();
        assert_eq!(link.record_sample(), 1);

        let report = link.end_session();
        assert!(report.acknowledged());
        assert!(!link.session().is_enabled());
        assert_eq!(link.mode, LinkMode::AwaitingConfig);
        assert_eq!(link.transport.lines()[3], "END");
    }
}
