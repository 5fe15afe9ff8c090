//! Human-readable error descriptions and structured JSON error formatting.

use motor_core::error::{BuildError, MotorError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => {
                "What happened: No encoder input was provided to the controller.\nLikely causes: The encoder back-end failed to initialize or was not wired into the builder.\nHow to fix: Ensure the encoder is created successfully and passed via with_encoder(...).".to_string()
            }
            BuildError::MissingPwm => {
                "What happened: No PWM output was provided to the controller.\nLikely causes: The PWM back-end failed to initialize or was not wired into the builder.\nHow to fix: Ensure the PWM output is created successfully and passed via with_pwm(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid controller configuration ({msg}).\nLikely causes: Out-of-range values in [motor], [driver] or [pid].\nHow to fix: Edit the config file, then rerun. See etc/motor_config.toml for a sample."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<MotorError>() {
        return match me {
            MotorError::Encoder(msg) => format!(
                "What happened: The encoder input could not be used ({msg}).\nLikely causes: Wrong [pins] encoder_a/encoder_b, missing GPIO permissions, or the encoder was already subscribed.\nHow to fix: Check the wiring and [pins], and run with access to /dev/gpiomem."
            ),
            MotorError::Hardware(msg) | MotorError::HardwareFault(msg) => format!(
                "What happened: The motor output reported a fault ({msg}).\nLikely causes: PWM pin unavailable, driver not powered, or a duty cycle the back-end rejected.\nHow to fix: Check [pins].pwm and the motor driver, then re-run with --log-level=debug."
            ),
            MotorError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo in the TOML or an out-of-range value.\nHow to fix: Edit the config file and try again."
            ),
            MotorError::Io(msg) => format!(
                "What happened: An I/O operation failed ({msg}).\nLikely causes: Missing file, wrong path, or insufficient permissions.\nHow to fix: Check the path passed via --config or --trace."
            ),
        };
    }

    // String-based heuristics for errors coming from init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("gpio back-end") {
        return "What happened: The gpio back-end was requested but this binary was built without it.\nLikely causes: [backend] kind = \"gpio\" on a build without the `hardware` feature.\nHow to fix: Rebuild with --features hardware, or set [backend] kind = \"sim\".".to_string();
    }

    if lower.contains("trace csv") {
        return format!(
            "What happened: The trace file could not be written.\nLikely causes: The directory does not exist or is not writable.\nHow to fix: Pass a writable path to --trace. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 3, encoder 4, output 5, I/O 6, anything else 1.
/// Clap usage errors exit with 2 before any of this runs.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<MotorError>() {
        Some(MotorError::Config(_)) => 3,
        Some(MotorError::Encoder(_)) => 4,
        Some(MotorError::Hardware(_) | MotorError::HardwareFault(_)) => 5,
        Some(MotorError::Io(_)) => 6,
        None => 1,
    }
}

/// Stable name for the error kind, used as the JSON `reason`.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => "MissingEncoder",
            BuildError::MissingPwm => "MissingPwm",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<MotorError>() {
        Some(MotorError::Hardware(_)) => "Hardware",
        Some(MotorError::HardwareFault(_)) => "HardwareFault",
        Some(MotorError::Encoder(_)) => "Encoder",
        Some(MotorError::Config(_)) => "Config",
        Some(MotorError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": error_reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(BuildError::MissingEncoder), 3, "MissingEncoder")]
    #[case(eyre::Report::new(BuildError::InvalidConfig("pwm_frequency_hz must be > 0")), 3, "InvalidConfig")]
    #[case(eyre::Report::new(MotorError::Config("bad toml".into())), 3, "Config")]
    #[case(eyre::Report::new(MotorError::Encoder("pin 17 busy".into())), 4, "Encoder")]
    #[case(eyre::Report::new(MotorError::HardwareFault("pwm".into())), 5, "HardwareFault")]
    #[case(eyre::Report::new(MotorError::Io("nope".into())), 6, "Io")]
    #[case(eyre::eyre!("something else"), 1, "Error")]
    fn codes_and_reasons(#[case] err: eyre::Report, #[case] code: i32, #[case] reason: &str) {
        assert_eq!(exit_code_for_error(&err), code);
        assert_eq!(error_reason_name(&err), reason);
    }

    #[test]
    fn typed_errors_survive_context() {
        let err: eyre::Result<()> =
            Err(eyre::Report::new(MotorError::Hardware("refused".into()))).wrap_err("set_duty_cycle");
        let err = err.unwrap_err();
        assert_eq!(exit_code_for_error(&err), 5);
        assert!(humanize(&err).contains("refused"));
    }

    #[test]
    fn json_error_is_parseable() {
        let err = eyre::Report::new(BuildError::MissingPwm);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "MissingPwm");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().starts_with("What happened"));
    }

    #[test]
    fn unknown_errors_get_generic_help() {
        let err = eyre::eyre!("boom");
        let text = humanize(&err);
        assert!(text.starts_with("Something went wrong."));
        assert!(text.contains("boom"));
    }
}
