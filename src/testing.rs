//! Test doubles for the modem and the clock.

use std::collections::VecDeque;

use crate::clock::Clock;
use crate::transport::ModemTransport;

/// Error returned by a [`ScriptedModem`] marked as broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Broken;

/// A modem that answers each flushed command with the next canned reply.
///
/// Replies are inserted ahead of any inbound bytes still waiting to be read,
/// the way a real modem answers a command before relaying queued messages.
#[derive(Debug, Default)]
pub(crate) struct ScriptedModem {
    rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    written: Vec<Vec<u8>>,
    reads: usize,
    pub(crate) broken: bool,
}

impl ScriptedModem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_replies(replies: &[&str]) -> Self {
        let mut modem = Self::new();
        modem
            .replies
            .extend(replies.iter().map(|reply| reply.as_bytes().to_vec()));
        modem
    }

    /// Makes `bytes` readable right away, behind anything already queued.
    pub(crate) fn push_inbound(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Every flushed write, terminators included.
    pub(crate) fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Every flushed write as text, without the trailing `\r\n`.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.written
            .iter()
            .map(|line| {
                let line = line.strip_suffix(b"\r\n").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Number of `read_byte` calls so far.
    pub(crate) fn reads_attempted(&self) -> usize {
        self.reads
    }
}

impl ModemTransport for ScriptedModem {
    type Error = Broken;

    fn read_byte(&mut self) -> nb::Result<u8, Broken> {
        self.reads += 1;
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Broken> {
        if self.broken {
            return Err(Broken);
        }
        self.pending.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Broken> {
        if self.broken {
            return Err(Broken);
        }
        self.written.push(core::mem::take(&mut self.pending));
        if let Some(reply) = self.replies.pop_front() {
            for byte in reply.into_iter().rev() {
                self.rx.push_front(byte);
            }
        }
        Ok(())
    }
}

/// A clock that moves forward by `step_ms` every time its seconds are read.
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    pub(crate) now_ms: u64,
    pub(crate) step_ms: u64,
}

impl ManualClock {
    pub(crate) fn at(secs: u32) -> Self {
        Self {
            now_ms: u64::from(secs) * 1_000,
            step_ms: 0,
        }
    }

    pub(crate) fn ticking(secs: u32, step_ms: u64) -> Self {
        Self {
            step_ms,
            ..Self::at(secs)
        }
    }
}

impl Clock for ManualClock {
    fn secs(&mut self) -> u32 {
        let secs = (self.now_ms / 1_000) as u32;
        self.now_ms += self.step_ms;
        secs
    }

    fn millis(&mut self) -> u16 {
        (self.now_ms % 1_000) as u16
    }

    fn set_secs(&mut self, secs: u32) {
        self.now_ms = u64::from(secs) * 1_000;
    }
}
