#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = sigwire::Message::parse(data) {
        let _ = msg.pack();
    }
});
