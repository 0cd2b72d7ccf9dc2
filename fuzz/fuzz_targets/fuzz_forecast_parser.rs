//! Fuzz target: forecast body parsing and rain evaluation
//!
//! Feeds arbitrary bytes as an HTTP body.  Parsing must never panic, and
//! any document that does parse must evaluate without panicking for any
//! threshold.
//!
//! cargo fuzz run fuzz_forecast_parser

#![no_main]

use cropspray::adapters::weather::{parse_forecast, rain_expected};
use libfuzzer_sys::fuzz_target;
use time::macros::date;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = parse_forecast(data) else {
        return;
    };
    let today = date!(2024-05-01);
    for threshold in [0.0, 0.5, 1.0, f32::NAN] {
        let _ = rain_expected(&doc, today, threshold);
    }
});
