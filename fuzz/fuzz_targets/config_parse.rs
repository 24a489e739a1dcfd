#![no_main]

use heatsep::builder::SeparatorBuilder;
use heatsep::config::HarnessConfig;
use heatsep::sync::SeparatorSet;
use libfuzzer_sys::fuzz_target;

// Fuzz the JSON configuration loader
//
// Any input must either be rejected with a ConfigError or yield a
// configuration whose every entry builds or fails cleanly.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = HarnessConfig::from_json_str(text) else {
        return;
    };

    assert!((0.0..=1.0).contains(&config.hot_key_portion));
    let mut names: Vec<&str> = config.separators.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), config.separators.len());

    if let Ok(set) = SeparatorSet::<u64>::from_config(&config, &SeparatorBuilder::new()) {
        assert_eq!(set.len(), config.separators.len());
    }
});
