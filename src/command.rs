//! AT command rendering and acknowledgement classification.
//!
//! The modem speaks a textual command protocol: each command is one line,
//! answered by an acknowledgement line. The modem's framing of that answer
//! is unreliable (partial `OK` tokens and a stray carriage return after a
//! lone `O` have all been observed), so [`classify_ack`] accepts a small
//! fixed set of spellings.
//!
//! | Command                    | Rendered line                             |
//! |----------------------------|-------------------------------------------|
//! | [`Command::SetIdentity`]   | `AT+MQTTSET="","","<id>",<keepalive>`      |
//! | [`Command::SetTopics`]     | `AT+MQTTTOPIC="<id>/","<id>/CONFIG/"`      |
//! | [`Command::Connect`]       | `AT+MQTTCON=0,"<host>",<port>`             |
//! | [`Command::PublishBulk`]   | `AT+MQTTPUBSEND=<len>`                    |
//! | [`Command::Reset`]         | `AT+RST`                                  |
//!
//! Line terminators are not part of the rendered command; the driver appends
//! `\r\n` when it writes a command.

use core::fmt::Write;

use heapless::String;

use crate::consts::COMMAND_CAPACITY;
use crate::error::LinkError;

/// A rendered command line, without terminator.
pub type CommandLine = String<COMMAND_CAPACITY>;

/// Affirmative acknowledgement spellings, compared against the whole line.
pub const ACK_OK_TOKENS: [&[u8]; 4] = [b"OK\r", b"OK", b"O", b"O\r"];

/// Negative acknowledgement spelling, compared against the whole line.
pub const ACK_ERROR_TOKEN: &[u8] = b"ERROR\r";

/// Suffix of the subscribe topic, appended to the device identity.
pub const CONFIG_TOPIC_SUFFIX: &str = "/CONFIG/";

/// Commands understood by the modem's MQTT client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Command<'a> {
    /// Configure client identity and keepalive timeout.
    SetIdentity {
        /// MQTT client identity.
        client_id: &'a str,
        /// Keepalive timeout, in seconds.
        keepalive_seconds: u16,
    },
    /// Publish to `"<device_id>/"` and subscribe to `"<device_id>/CONFIG/"`.
    SetTopics {
        /// Topic root.
        device_id: &'a str,
    },
    /// Connect to the broker.
    Connect {
        /// Broker host.
        host: &'a str,
        /// Broker port.
        port: u16,
    },
    /// Announce a bulk publish of `len` raw bytes.
    PublishBulk {
        /// Number of payload bytes that will follow.
        len: usize,
    },
    /// Hard reset of the modem.
    Reset,
}

impl Command<'_> {
    /// Renders the command into a fixed-size line.
    ///
    /// # Errors
    /// [`LinkError::CommandTooLong`] if the line exceeds [`COMMAND_CAPACITY`].
    pub fn render(&self) -> Result<CommandLine, LinkError> {
        let mut line = CommandLine::new();
        match *self {
            Command::SetIdentity {
                client_id,
                keepalive_seconds,
            } => write!(line, "AT+MQTTSET=\"\",\"\",\"{}\",{}", client_id, keepalive_seconds),
            Command::SetTopics { device_id } => write!(
                line,
                "AT+MQTTTOPIC=\"{}/\",\"{}{}\"",
                device_id, device_id, CONFIG_TOPIC_SUFFIX
            ),
            Command::Connect { host, port } => {
                write!(line, "AT+MQTTCON=0,\"{}\",{}", host, port)
            }
            Command::PublishBulk { len } => write!(line, "AT+MQTTPUBSEND={}", len),
            Command::Reset => line.write_str("AT+RST"),
        }
        .map_err(|_| LinkError::CommandTooLong)?;
        Ok(line)
    }

    /// Short human-readable name, used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetIdentity { .. } => "set identity",
            Command::SetTopics { .. } => "set topics",
            Command::Connect { .. } => "connect",
            Command::PublishBulk { .. } => "publish",
            Command::Reset => "reset",
        }
    }
}

/// Outcome of one acknowledgement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Ack {
    /// One of [`ACK_OK_TOKENS`].
    Ok,
    /// [`ACK_ERROR_TOKEN`].
    Error,
}

/// Classifies a line read from the modem.
///
/// Returns `None` for anything that is neither an accepted affirmative
/// spelling nor the failure spelling, including an empty line; the caller
/// keeps waiting in that case.
pub fn classify_ack(line: &[u8]) -> Option<Ack> {
    if line == ACK_ERROR_TOKEN {
        Some(Ack::Error)
    } else if ACK_OK_TOKENS.iter().any(|token| *token == line) {
        Some(Ack::Ok)
    } else {
        None
    }
}
