use crate::buffer::Sample;
use crate::clock::Clock;
use crate::consts::{DRAIN_EVERY_SAMPLES, MAX_CHANNELS_USIZE, US_PER_MS};
use crate::node::SensorNode;
use crate::transport::ModemTransport;
use embedded_hal::delay::DelayNs;

/// Runs one armed capture session in a blocking loop.
///
/// This is a simple pacing loop for targets without a sampling timer. It
/// waits for the session's start second, then calls `sampler` once per
/// sample period with the active channel count, timestamps each sample in
/// milliseconds since the start, drains every [`DRAIN_EVERY_SAMPLES`]
/// samples, and finishes the session (final drain plus `END`) once the
/// target count is reached.
///
/// # Arguments
/// - `node`: a node whose session was armed by `start_session`.
/// - `sampler`: reads the analog channels; slots past the channel count are
///   ignored.
///
/// # Returns
/// The number of samples captured, `0` if no session was armed.
///
/// # Example
/// ```rust,ignore
/// use sensorlink::timer::run_capture_loop;
///
/// loop {
///     node.start_session();
///     run_capture_loop(&mut node, |channels| read_adc(channels));
/// }
/// ```
///
/// # Notes
/// - The period is measured by `node.link.delay`, so sampling, encoding and
///   draining time all stretch the effective period.
pub fn run_capture_loop<T, D, C, S, const N: usize>(
    node: &mut SensorNode<T, D, C, N>,
    mut sampler: S,
) -> u32
where
    T: ModemTransport,
    D: DelayNs,
    C: Clock,
    S: FnMut(u8) -> [u16; MAX_CHANNELS_USIZE],
{
    let session = *node.link.session();
    if !session.is_enabled() {
        warn!("capture loop started without an armed session");
        return 0;
    }

    node.wait_for_start();
    info!("capturing {} samples", session.target_samples());

    let period_us = session.sample_period_us();
    while !node.capture_complete() {
        let elapsed_us = u64::from(node.link.session().count()) * u64::from(period_us);
        let timestamp = (elapsed_us / u64::from(US_PER_MS)) as u16;
        let _ = node.record(Sample::new(timestamp, sampler(session.channels())));
        if node.link.session().count() % DRAIN_EVERY_SAMPLES == 0 {
            let _ = node.drain();
        }
        node.link.delay.delay_us(period_us);
    }

    let captured = node.link.session().count();
    let _ = node.finish_session();
    captured
}
