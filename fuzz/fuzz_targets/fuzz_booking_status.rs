#![no_main]
use libfuzzer_sys::fuzz_target;

use farmstay_booking::domain::booking::BookingStatus;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        if let Ok(status) = raw.parse::<BookingStatus>() {
            assert_eq!(status.as_str().parse::<BookingStatus>().ok(), Some(status));
        }
    }
});
