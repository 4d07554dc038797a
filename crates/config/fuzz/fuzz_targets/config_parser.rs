//! Fuzzing harness for config parsing
//!
//! Arbitrary input must never panic while parsing, validating or
//! applying environment overrides.
//! Run with: cargo fuzz run config_parser

#![no_main]
use libfuzzer_sys::fuzz_target;
use threadline_config::{Config, ConfigManager};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(mut config) = toml::from_str::<Config>(s) {
        let _ = config.validate();
        // Feed the same text back in as every override value
        ConfigManager::apply_overrides(&mut config, |_| Some(s.to_string()));
        let _ = config.validate();
    }
});
