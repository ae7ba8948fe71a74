#![no_main]
use libfuzzer_sys::fuzz_target;

// Settings TOML: parse and validate may fail, never panic.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = centerout_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
