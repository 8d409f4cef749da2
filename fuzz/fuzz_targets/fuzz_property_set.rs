//! Fuzz target: inbound message decoding
//!
//! Feeds arbitrary bytes through the same path an inbound MQTT message
//! takes: the bounded copy, then the property-set and post-reply
//! decoders.  Nothing may panic, and oversize input must be refused
//! before any parsing.
//!
//! cargo fuzz run fuzz_property_set

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomsense::app::payload::{
    MAX_PAYLOAD_LEN, copy_bounded, decode_post_reply, decode_property_set,
};

fuzz_target!(|data: &[u8]| {
    match copy_bounded(data) {
        Ok(buffer) => {
            assert!(data.len() <= MAX_PAYLOAD_LEN);
            assert_eq!(buffer.as_slice(), data);
            let _ = decode_property_set(&buffer);
            let _ = decode_post_reply(&buffer);
        }
        Err(_) => assert!(data.len() > MAX_PAYLOAD_LEN),
    }
});
