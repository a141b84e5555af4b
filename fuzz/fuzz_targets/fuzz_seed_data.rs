#![no_main]
use libfuzzer_sys::fuzz_target;

use farmstay_booking::adapters::memory::store::SeedData;

fuzz_target!(|data: &[u8]| {
    if let Ok(seed) = serde_json::from_slice::<SeedData>(data) {
        for property in &seed.properties {
            let _ = property.resolve_room("double");
            let _ = property.is_listed();
        }
    }
});
