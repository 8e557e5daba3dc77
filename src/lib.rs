//! # sensorlink
//!
//! A portable, no_std Rust driver for sensor nodes that stream analog samples
//! to a remote collector through a serial-attached MQTT radio modem.
//!
//! The crate has two cores:
//! - a fixed-capacity circular [`SampleBuffer`](buffer::SampleBuffer) with
//!   single-producer/single-consumer semantics and a compact big-endian wire
//!   encoding
//! - an AT-command protocol engine, [`LinkDriver`](driver::LinkDriver), that
//!   turns the modem's unreliable byte stream into a request/acknowledge
//!   protocol: broker handshake, bulk publish, configuration wait, liveness
//!   ping and time synchronization
//!
//! The driver is built on:
//! - `embedded-hal` for delays
//! - `nb` for the non-blocking modem byte stream
//! - `heapless` for fixed-size lines, commands and (without `std`) storage
//! - interrupt-safe buffer sharing with `critical-section`
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support and replaces `heapless::Vec`s with `std::vec::Vec`s |
//! | `delay-loop`          | Blocking capture loop paced by `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | Buffer shared with a sampling interrupt through `critical_section::with` |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sensorlink::config::LinkConfig;
//! use sensorlink::driver::LinkDriver;
//! use sensorlink::node::SensorNode;
//!
//! let link = LinkDriver::new(uart, delay, rtc, LinkConfig::default());
//! let mut node: SensorNode<_, _, _, 4096> = SensorNode::new(link);
//! node.connect();
//! loop {
//!     node.start_session();
//!     sensorlink::timer::run_capture_loop(&mut node, |channels| read_adc(channels));
//! }
//! ```
//!
//! ## Wire format
//!
//! Drained samples are published as `timestamp, ch1, .., chN`, each a
//! big-endian `u16`. The `TIME` message carries the clock's seconds as a
//! little-endian `u32`.
//!
//! ## Integration Notes
//!
//! - Every protocol wait is a poll loop; a call blocks the caller until it
//!   returns. Interleave sampling and draining at a coarser grain.
//! - Only one sampling interrupt should push into the shared buffer.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

#[macro_use]
mod fmt;

pub mod buffer;
pub mod clock;
pub mod command;
pub mod config;
pub mod consts;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod node;
pub mod session;
#[cfg(test)]
mod testing;
pub mod timer;
pub mod transport;
