#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(seq) = centerout_config::parse_targets(data) {
        assert!(!seq.is_empty());
    }
});
