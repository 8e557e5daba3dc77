use crate::buffer::{Drained, Sample, SampleBuffer};
use core::cell::RefCell;
use critical_section::Mutex;

/// A sample buffer shared between a sampling interrupt and the main loop.
pub type SharedBuffer<const N: usize> = Mutex<RefCell<Option<SampleBuffer<N>>>>;

/// Used to initialize the global static sample buffer for use with
/// `critical_section`.
///
/// # Returns
/// * An empty, not yet set up, shared buffer
///
/// # Example
/// ```rust
/// use sensorlink::timer::{SharedBuffer, global_buffer_init};
///
/// static SAMPLES: SharedBuffer<1024> = global_buffer_init::<1024>();
/// ```
pub const fn global_buffer_init<const N: usize>() -> SharedBuffer<N> {
    Mutex::new(RefCell::new(None))
}

/// Creates (or replaces) the shared buffer for `channels` active channels.
///
/// Call this once a session has been configured, before the sampling
/// interrupt is enabled.
pub fn global_buffer_setup<const N: usize>(global: &'static SharedBuffer<N>, channels: u8) {
    critical_section::with(|cs| {
        let _ = global
            .borrow(cs)
            .replace(Some(SampleBuffer::new(channels)));
    });
}

/// Pushes one sample from the interrupt handler.
///
/// Returns `false` if the buffer is full or has not been set up.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     let sample = read_adc();
///     global_buffer_push(&SAMPLES, sample);
/// }
/// ```
pub fn global_buffer_push<const N: usize>(global: &'static SharedBuffer<N>, sample: Sample) -> bool {
    critical_section::with(|cs| {
        global
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .is_some_and(|buffer| buffer.push(sample))
    })
}

/// Pops up to `count` samples for the drain path.
///
/// Returns `None` if the buffer has not been set up.
pub fn global_buffer_pop<const N: usize>(
    global: &'static SharedBuffer<N>,
    count: usize,
) -> Option<Drained> {
    critical_section::with(|cs| {
        global
            .borrow(cs)
            .borrow_mut()
            .as_mut()
            .map(|buffer| buffer.pop(count))
    })
}

/// Number of samples currently held, `0` if the buffer has not been set up.
pub fn global_buffer_len<const N: usize>(global: &'static SharedBuffer<N>) -> usize {
    critical_section::with(|cs| {
        global
            .borrow(cs)
            .borrow()
            .as_ref()
            .map_or(0, SampleBuffer::len)
    })
}
