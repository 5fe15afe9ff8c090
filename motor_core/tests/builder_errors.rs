use motor_core::error::BuildError;
use motor_core::mocks::{ManualEncoder, RecordingPwm};
use motor_core::{MotorCfg, MotorController, PidCfg, PulseMapping};
use rstest::rstest;

fn invalid_config_message(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => *msg,
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_encoder_yields_typed_build_error() {
    let err = MotorController::builder()
        // missing with_encoder()
        .with_pwm(RecordingPwm::new())
        .try_build()
        .expect_err("should fail with MissingEncoder");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingEncoder) => {}
        other => panic!("expected MissingEncoder, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_pwm_yields_typed_build_error() {
    let err = MotorController::builder()
        .with_encoder(ManualEncoder::default())
        .try_build()
        .expect_err("should fail with MissingPwm");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingPwm)
    ));
}

#[rstest]
#[case(MotorCfg { ticks_per_revolution: 0.0, pwm_frequency_hz: 400.0 }, PulseMapping::GOBILDA, "ticks_per_revolution")]
#[case(MotorCfg { ticks_per_revolution: f64::NAN, pwm_frequency_hz: 400.0 }, PulseMapping::GOBILDA, "ticks_per_revolution")]
#[case(MotorCfg { ticks_per_revolution: 537.7, pwm_frequency_hz: 0.0 }, PulseMapping::GOBILDA, "pwm_frequency_hz")]
#[case(MotorCfg::gobilda_312(), PulseMapping::new(1950.0, 1050.0), "0 < min < max")]
#[case(MotorCfg::gobilda_312(), PulseMapping::new(0.0, 1000.0), "0 < min < max")]
#[case(MotorCfg { ticks_per_revolution: 537.7, pwm_frequency_hz: 1000.0 }, PulseMapping::GOBILDA, "pwm period")]
fn rejects_invalid_motor_and_mapping(
    #[case] motor: MotorCfg,
    #[case] mapping: PulseMapping,
    #[case] needle: &str,
) {
    let err = MotorController::builder()
        .with_encoder(ManualEncoder::default())
        .with_pwm(RecordingPwm::new())
        .with_motor(motor)
        .with_pulse_mapping(mapping)
        .build()
        .expect_err("invalid config");
    assert!(invalid_config_message(&err).contains(needle));
}

#[rstest]
#[case(PidCfg { windup_guard: -1.0, ..PidCfg::default() }, "windup_guard")]
#[case(PidCfg { min_sample_interval_s: -0.1, ..PidCfg::default() }, "min_sample_interval")]
#[case(PidCfg { kd: f64::INFINITY, ..PidCfg::default() }, "finite")]
fn rejects_invalid_pid(#[case] pid: PidCfg, #[case] needle: &str) {
    let err = MotorController::builder()
        .with_encoder(ManualEncoder::default())
        .with_pwm(RecordingPwm::new())
        .with_pid(pid)
        .build()
        .expect_err("invalid pid");
    assert!(invalid_config_message(&err).contains(needle));
}

#[test]
fn spark_mini_fits_a_400hz_period() {
    let pwm = RecordingPwm::new();
    MotorController::builder()
        .with_encoder(ManualEncoder::default())
        .with_pwm(pwm.clone())
        .with_pulse_mapping(PulseMapping::SPARK_MINI)
        .build()
        .expect("2500us fits in 2500us");
    // build starts the output at duty 0
    assert_eq!(pwm.writes(), vec![0.0]);
}

#[test]
fn failing_output_is_reported_as_hardware_error() {
    let err = MotorController::builder()
        .with_encoder(ManualEncoder::default())
        .with_pwm(RecordingPwm::failing())
        .build()
        .expect_err("pwm start refused");
    assert!(format!("{err:#}").contains("pwm start"));
    assert!(matches!(
        err.downcast_ref::<motor_core::MotorError>(),
        Some(motor_core::MotorError::Hardware(_))
    ));
}
