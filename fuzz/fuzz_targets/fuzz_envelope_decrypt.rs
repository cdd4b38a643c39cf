#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use vendor_auth::SecretString;
use vendor_gateway::{PayloadCipher, VendorSurface};

static CIPHER: LazyLock<PayloadCipher> = LazyLock::new(|| {
    PayloadCipher::new(VendorSurface::CardControl, &SecretString::new("fuzz-secret"))
        .expect("static secret is non-empty")
});

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    // Hostile bodies must fail cleanly, never panic
    let _ = CIPHER.decrypt(data, None);
    let _ = CIPHER.decrypt(data, Some("00000000-0000-0000-0000-000000000000"));
});
