#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or validate without panicking.
    if let Ok(cfg) = motor_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A config that validates must also have a usable pulse period.
            let period_us = 1_000_000.0 / cfg.motor.pwm_frequency_hz;
            assert!(period_us.is_finite() && period_us > 0.0);
        }
    }
});
