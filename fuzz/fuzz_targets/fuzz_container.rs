#![no_main]
use clausewitz_save::container::{GameFamily, SavegameContainer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for family in GameFamily::ALL {
        if let Ok(container) = SavegameContainer::decode(data, family) {
            let mut out = Vec::new();
            let _ = container.encode(family, &mut out);
        }
    }
});
