//! Fuzz target: modem response classification
//!
//! `parse_creg` and `classify_send` see whatever the UART delivers,
//! including line noise and truncated replies.
//!
//! cargo fuzz run fuzz_at_response

#![no_main]

use cropspray::adapters::gsm::{SendStatus, classify_send, parse_creg};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let _ = parse_creg(&text);
    match classify_send(&text) {
        SendStatus::Delivered => assert!(text.contains("OK")),
        SendStatus::Rejected => assert!(text.contains("ERROR")),
        SendStatus::Pending => {}
    }
});
