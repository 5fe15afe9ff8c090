//! Type-state builder for `MotorController` and generic `build_motor_controller`.
//!
//! The builder enforces at compile time that an encoder input and a PWM output
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use eyre::WrapErr;
use motor_traits::clock::{Clock, MonotonicClock};
use motor_traits::{PwmOutput, QuadratureInput};

use crate::config::{ControlMode, MotorCfg, PidCfg};
use crate::controller::{MotorCore, StepReport};
use crate::error::{BuildError, Result};
use crate::hw_error::map_hw_error;
use crate::pid::PidController;
use crate::pulse::PulseMapping;
use crate::quadrature::QuadratureDecoder;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Motor controller over boxed hardware back-ends.
pub struct MotorController {
    pub(crate) inner: MotorCore<Box<dyn QuadratureInput>, Box<dyn PwmOutput>>,
}

impl core::fmt::Debug for MotorController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorController")
            .field("mode", &self.inner.mode())
            .field("position", &self.inner.position())
            .field("accumulated_power", &self.inner.accumulated_power())
            .field("last_duty", &self.inner.last_duty_cycle())
            .finish()
    }
}

impl MotorController {
    /// Start building a MotorController.
    pub fn builder() -> MotorControllerBuilder<Missing, Missing> {
        MotorControllerBuilder::default()
    }

    pub fn step_control_loop(&mut self) -> Result<StepReport> {
        self.inner.step_control_loop()
    }

    pub fn position(&self) -> i64 {
        self.inner.position()
    }

    pub fn angle(&self) -> f64 {
        self.inner.angle()
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.inner.set_angle(angle);
    }

    pub fn angular_velocity(&mut self) -> f64 {
        self.inner.angular_velocity()
    }

    pub fn set_power(&mut self, power: Option<f64>) -> Result<()> {
        self.inner.set_power(power)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.inner.stop()
    }

    pub fn set_pid_coefficients(&mut self, kp: f64, ki: f64, kd: f64) {
        self.inner.set_pid_coefficients(kp, ki, kd);
    }

    pub fn set_target(&mut self, target: f64) {
        self.inner.set_target(target);
    }

    pub fn mode(&self) -> ControlMode {
        self.inner.mode()
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        self.inner.set_mode(mode);
    }

    pub fn accumulated_power(&self) -> f64 {
        self.inner.accumulated_power()
    }

    pub fn applied_power(&self) -> f64 {
        self.inner.applied_power()
    }

    pub fn pid(&self) -> &PidController {
        self.inner.pid()
    }

    pub fn pid_mut(&mut self) -> &mut PidController {
        self.inner.pid_mut()
    }

    pub fn pulse_mapping(&self) -> PulseMapping {
        self.inner.pulse_mapping()
    }

    pub fn motor_cfg(&self) -> MotorCfg {
        self.inner.motor_cfg()
    }

    pub fn last_duty_cycle(&self) -> f64 {
        self.inner.last_duty_cycle()
    }

    pub fn now_s(&self) -> f64 {
        self.inner.now_s()
    }
}

/// The loop runner drives either variant through this trait.
pub trait ControlLoop {
    fn step_control_loop(&mut self) -> Result<StepReport>;
    fn set_target(&mut self, target: f64);
    fn stop(&mut self) -> Result<()>;
    fn position(&self) -> i64;
    fn angle(&self) -> f64;
}

impl<E: QuadratureInput, P: PwmOutput> ControlLoop for MotorCore<E, P> {
    fn step_control_loop(&mut self) -> Result<StepReport> {
        MotorCore::step_control_loop(self)
    }
    fn set_target(&mut self, target: f64) {
        MotorCore::set_target(self, target);
    }
    fn stop(&mut self) -> Result<()> {
        MotorCore::stop(self)
    }
    fn position(&self) -> i64 {
        MotorCore::position(self)
    }
    fn angle(&self) -> f64 {
        MotorCore::angle(self)
    }
}

impl ControlLoop for MotorController {
    fn step_control_loop(&mut self) -> Result<StepReport> {
        self.inner.step_control_loop()
    }
    fn set_target(&mut self, target: f64) {
        self.inner.set_target(target);
    }
    fn stop(&mut self) -> Result<()> {
        self.inner.stop()
    }
    fn position(&self) -> i64 {
        self.inner.position()
    }
    fn angle(&self) -> f64 {
        self.inner.angle()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `MotorController`. All fields are validated on `build()`.
pub struct MotorControllerBuilder<E, P> {
    encoder: Option<Box<dyn QuadratureInput>>,
    pwm: Option<Box<dyn PwmOutput>>,
    motor: Option<MotorCfg>,
    mapping: Option<PulseMapping>,
    pid: Option<PidCfg>,
    mode: Option<ControlMode>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _e: PhantomData<E>,
    _p: PhantomData<P>,
}

impl Default for MotorControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            encoder: None,
            pwm: None,
            motor: None,
            mapping: None,
            pid: None,
            mode: None,
            clock: None,
            _e: PhantomData,
            _p: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(motor: &MotorCfg, mapping: &PulseMapping, pid: &PidCfg) -> Result<()> {
    if !motor.ticks_per_revolution.is_finite() || motor.ticks_per_revolution <= 0.0 {
        return Err(invalid("ticks_per_revolution must be > 0"));
    }
    if !motor.pwm_frequency_hz.is_finite() || motor.pwm_frequency_hz <= 0.0 {
        return Err(invalid("pwm_frequency_hz must be > 0"));
    }
    if !mapping.min_pulse_us.is_finite() || !mapping.max_pulse_us.is_finite() {
        return Err(invalid("pulse range must be finite"));
    }
    if mapping.min_pulse_us <= 0.0 || mapping.min_pulse_us >= mapping.max_pulse_us {
        return Err(invalid("pulse range must satisfy 0 < min < max"));
    }
    if mapping.max_pulse_us > crate::util::MICROS_PER_SEC as f64 / motor.pwm_frequency_hz {
        return Err(invalid("max pulse exceeds the pwm period"));
    }
    for gain in [pid.kp, pid.ki, pid.kd] {
        if !gain.is_finite() {
            return Err(invalid("pid gains must be finite"));
        }
    }
    if !pid.windup_guard.is_finite() || pid.windup_guard < 0.0 {
        return Err(invalid("windup_guard must be >= 0"));
    }
    if !pid.min_sample_interval_s.is_finite() || pid.min_sample_interval_s < 0.0 {
        return Err(invalid("min_sample_interval must be >= 0"));
    }
    Ok(())
}

/// Validate configuration and construct a `MotorCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `MotorControllerBuilder::try_build()` and `build_motor_controller()`.
fn validate_and_build<E: QuadratureInput, P: PwmOutput>(
    mut encoder: E,
    mut pwm: P,
    motor: MotorCfg,
    mapping: PulseMapping,
    pid: PidCfg,
    mode: ControlMode,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<MotorCore<E, P>> {
    validate(&motor, &mapping, &pid)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let (a, b) = encoder
        .levels()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("reading initial encoder levels")?;
    let decoder = Arc::new(QuadratureDecoder::new(a, b));
    let handler_decoder = Arc::clone(&decoder);
    encoder
        .subscribe(Box::new(move |channel, level| {
            handler_decoder.on_channel_edge(channel, level);
        }))
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("subscribing encoder edges")?;
    pwm.start(0.0)
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("pwm start")?;

    tracing::debug!(
        ticks_per_revolution = motor.ticks_per_revolution,
        pwm_frequency_hz = motor.pwm_frequency_hz,
        min_pulse_us = mapping.min_pulse_us,
        max_pulse_us = mapping.max_pulse_us,
        kp = pid.kp,
        ki = pid.ki,
        kd = pid.kd,
        %mode,
        "motor controller built"
    );

    Ok(MotorCore {
        _encoder: encoder,
        pwm,
        decoder,
        pid: PidController::with_epoch(pid, Arc::clone(&clock), epoch),
        mapping,
        motor,
        mode,
        accumulated_power: 0.0,
        applied_power: 0.0,
        last_duty: 0.0,
        prev_position: None,
        prev_time: None,
        clock,
        epoch,
    })
}

impl<E, P> MotorControllerBuilder<E, P> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<MotorController> {
        let encoder = self
            .encoder
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoder))?;
        let pwm = self
            .pwm
            .ok_or_else(|| eyre::Report::new(BuildError::MissingPwm))?;

        let inner = validate_and_build(
            encoder,
            pwm,
            self.motor.unwrap_or_default(),
            self.mapping.unwrap_or_default(),
            self.pid.unwrap_or_default(),
            self.mode.unwrap_or_default(),
            self.clock,
        )?;

        Ok(MotorController { inner })
    }
}

/// Chainable setters that do not affect type-state.
impl<E, P> MotorControllerBuilder<E, P> {
    pub fn with_motor(mut self, motor: MotorCfg) -> Self {
        self.motor = Some(motor);
        self
    }
    pub fn with_pulse_mapping(mut self, mapping: PulseMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }
    pub fn with_pid(mut self, pid: PidCfg) -> Self {
        self.pid = Some(pid);
        self
    }
    pub fn with_mode(mut self, mode: ControlMode) -> Self {
        self.mode = Some(mode);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<P> MotorControllerBuilder<Missing, P> {
    pub fn with_encoder(
        self,
        encoder: impl QuadratureInput + 'static,
    ) -> MotorControllerBuilder<Set, P> {
        MotorControllerBuilder {
            encoder: Some(Box::new(encoder)),
            pwm: self.pwm,
            motor: self.motor,
            mapping: self.mapping,
            pid: self.pid,
            mode: self.mode,
            clock: self.clock,
            _e: PhantomData,
            _p: PhantomData,
        }
    }
}

impl<E> MotorControllerBuilder<E, Missing> {
    pub fn with_pwm(self, pwm: impl PwmOutput + 'static) -> MotorControllerBuilder<E, Set> {
        MotorControllerBuilder {
            encoder: self.encoder,
            pwm: Some(Box::new(pwm)),
            motor: self.motor,
            mapping: self.mapping,
            pid: self.pid,
            mode: self.mode,
            clock: self.clock,
            _e: PhantomData,
            _p: PhantomData,
        }
    }
}

impl MotorControllerBuilder<Set, Set> {
    /// Validate and build. Only available when the encoder and PWM output are set.
    pub fn build(self) -> Result<MotorController> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias using the unified core.
pub type MotorControllerG<E, P> = MotorCore<E, P>;

/// Build a generic, statically-dispatched `MotorControllerG` from concrete back-ends.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_motor_controller<E, P>(
    encoder: E,
    pwm: P,
    motor: MotorCfg,
    mapping: PulseMapping,
    pid: Option<PidCfg>,
    mode: ControlMode,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<MotorControllerG<E, P>>
where
    E: QuadratureInput + 'static,
    P: PwmOutput + 'static,
{
    validate_and_build(
        encoder,
        pwm,
        motor,
        mapping,
        pid.unwrap_or_default(),
        mode,
        clock,
    )
}
