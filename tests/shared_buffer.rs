use sensorlink::buffer::Sample;
use sensorlink::{init_sample_buffer, pop_samples, push_sample, setup_sample_buffer};

init_sample_buffer!(8);

#[test]
fn test_macros_share_one_buffer() {
    assert!(!push_sample!(Sample::default()));

    setup_sample_buffer!(3);
    assert!(push_sample!(Sample::new(0x0001, [0x0102, 0x0304, 0x0506])));

    let drained = pop_samples!(4).unwrap();
    assert_eq!(drained.count, 1);
    assert_eq!(
        &drained.bytes[..],
        &[0x00, 0x01, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06]
    );
    assert_eq!(pop_samples!(4).map(|drained| drained.count), Some(0));
}
