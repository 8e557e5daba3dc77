//! Runtime link configuration.

use crate::consts::{BROKER_HOST, BROKER_PORT, DEVICE_ID, KEEPALIVE_SECONDS};

/// Identity and broker settings used by the handshake.
///
/// [`LinkConfig::default`] reproduces the compile-time constants in
/// [`crate::consts`]; override individual fields for boards that need a
/// different identity or broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkConfig {
    /// MQTT client identity, also the root of both topics.
    pub device_id: &'static str,
    /// Broker host (IPv4 address or name understood by the modem).
    pub broker_host: &'static str,
    /// Broker TCP port.
    pub broker_port: u16,
    /// MQTT keepalive timeout, in seconds.
    pub keepalive_seconds: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_id: DEVICE_ID,
            broker_host: BROKER_HOST,
            broker_port: BROKER_PORT,
            keepalive_seconds: KEEPALIVE_SECONDS,
        }
    }
}
