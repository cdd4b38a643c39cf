#![no_main]

use libfuzzer_sys::fuzz_target;
use vendor_gateway::classifier::{Classification, classify_body, classify_card_body};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    for outcome in [classify_body(data), classify_card_body(data)] {
        if let Classification::Retriable(e) | Classification::Fatal(e) = outcome {
            let _ = e.user_message();
        }
    }
});
