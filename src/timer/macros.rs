/// Declares the global `SAMPLE_BUFFER` static used by the other sample
/// buffer macros.
///
/// # Arguments
/// * The buffer capacity, in samples (defaults to
///   [`DEFAULT_BUFFER_CAPACITY`](crate::consts::DEFAULT_BUFFER_CAPACITY))
///
/// # Example
/// ```rust
/// sensorlink::init_sample_buffer!(512);
///
/// fn main() {
///     sensorlink::setup_sample_buffer!(2);
/// }
/// ```
#[macro_export]
macro_rules! init_sample_buffer {
    () => {
        $crate::init_sample_buffer!($crate::consts::DEFAULT_BUFFER_CAPACITY);
    };
    ( $capacity:expr ) => {
        static SAMPLE_BUFFER: $crate::timer::SharedBuffer<{ $capacity }> =
            $crate::timer::global_buffer_init::<{ $capacity }>();
    };
}

/// (Re)creates the global `SAMPLE_BUFFER` for the given channel count.
///
/// This macro assumes `SAMPLE_BUFFER` was declared with `init_sample_buffer!`.
#[macro_export]
macro_rules! setup_sample_buffer {
    ( $channels:expr ) => {
        $crate::timer::global_buffer_setup(&SAMPLE_BUFFER, $channels)
    };
}

/// Pushes a sample into the global `SAMPLE_BUFFER`; evaluates to `false` if
/// it was dropped.
///
/// Intended for the sampling interrupt handler.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIM2() {
///     push_sample!(Sample::from_readings(now_ms(), &read_adc()));
/// }
/// ```
///
/// # Notes
/// - Safe to call before `setup_sample_buffer!`; the sample is dropped.
#[macro_export]
macro_rules! push_sample {
    ( $sample:expr ) => {
        $crate::timer::global_buffer_push(&SAMPLE_BUFFER, $sample)
    };
}

/// Pops up to `count` samples from the global `SAMPLE_BUFFER`, evaluating
/// to an `Option<Drained>`.
#[macro_export]
macro_rules! pop_samples {
    ( $count:expr ) => {
        $crate::timer::global_buffer_pop(&SAMPLE_BUFFER, $count)
    };
}
