#![no_main]

use libfuzzer_sys::fuzz_target;

use sigwire::HmacProvider;

fuzz_target!(|data: &[u8]| {
    let _ = sigwire::strip(data);

    let provider = HmacProvider::new("pRZgBrBvI4NAHZYhxmhs/Q==");
    let mut buf = data.to_vec();
    let _ = sigwire::verify_at(&mut buf, &provider, "", false, 1594855491);
});
