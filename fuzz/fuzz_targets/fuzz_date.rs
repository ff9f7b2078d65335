#![no_main]
use clausewitz_save::common::Date;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(date) = Date::parse(data) {
        if let Ok(again) = Date::parse(date.game_fmt()) {
            assert!(again == date);
        }
    }
});
