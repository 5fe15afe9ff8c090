//! The closed-loop motor controller (`MotorCore`).
//!
//! Each control step reads the decoder (or derives velocity from it), runs the
//! PID, integrates the correction into a power level and writes the matching
//! PWM duty cycle.

use std::sync::Arc;
use std::time::Instant;

use eyre::WrapErr;
use motor_traits::clock::Clock;

use crate::config::{ControlMode, MotorCfg};
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::pid::PidController;
use crate::pulse::PulseMapping;
use crate::quadrature::{MAX_POSITION, MIN_POSITION, QuadratureDecoder};
use crate::util::duty_cycle_percent;

/// What one control step observed and commanded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Seconds since the controller was built.
    pub t_s: f64,
    pub mode: ControlMode,
    /// Value fed to the PID: ticks (position) or ticks/s (velocity).
    pub feedback: f64,
    pub setpoint: f64,
    /// PID output added to the accumulated power this step (0 in raw-power mode).
    pub correction: f64,
    /// Power actually mapped to the output, after clamping.
    pub power: f64,
    pub duty_cycle: f64,
    pub position: i64,
}

/// Unified controller for both dynamic (boxed) and generic (static dispatch) use.
pub struct MotorCore<E: motor_traits::QuadratureInput, P: motor_traits::PwmOutput> {
    // Held so back-end resources (e.g. interrupt registrations) live as long as the controller.
    pub(crate) _encoder: E,
    pub(crate) pwm: P,
    pub(crate) decoder: Arc<QuadratureDecoder>,
    pub(crate) pid: PidController,
    pub(crate) mapping: PulseMapping,
    pub(crate) motor: MotorCfg,
    pub(crate) mode: ControlMode,
    pub(crate) accumulated_power: f64,
    pub(crate) applied_power: f64,
    pub(crate) last_duty: f64,
    pub(crate) prev_position: Option<i64>,
    pub(crate) prev_time: Option<f64>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
}

impl<E: motor_traits::QuadratureInput, P: motor_traits::PwmOutput> core::fmt::Debug
    for MotorCore<E, P>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorCore")
            .field("mode", &self.mode)
            .field("position", &self.decoder.read())
            .field("accumulated_power", &self.accumulated_power)
            .field("last_duty", &self.last_duty)
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

impl<E: motor_traits::QuadratureInput, P: motor_traits::PwmOutput> MotorCore<E, P> {
    /// Seconds since the controller was built, on its clock.
    pub fn now_s(&self) -> f64 {
        self.clock.secs_since(self.epoch)
    }

    /// Encoder position in ticks.
    pub fn position(&self) -> i64 {
        self.decoder.read()
    }

    /// Output-shaft angle in revolutions.
    pub fn angle(&self) -> f64 {
        self.decoder.read() as f64 / self.motor.ticks_per_revolution
    }

    /// Overwrite the encoder position so that the shaft reads `angle` revolutions.
    /// Angles beyond the decoder range are clamped to it; NaN reads as 0.
    pub fn set_angle(&mut self, angle: f64) {
        let ticks = (angle * self.motor.ticks_per_revolution)
            .round()
            .clamp(MIN_POSITION as f64, MAX_POSITION as f64);
        // NaN passes through `clamp` and becomes 0 here.
        self.decoder.write(ticks as i64);
        tracing::debug!(angle, ticks, "encoder position overwritten");
    }

    /// Ticks per second since the previous call. The first call, and any call
    /// where no time has passed, returns 0. The sample is always replaced.
    pub fn angular_velocity(&mut self) -> f64 {
        let pos = self.decoder.read();
        let now = self.now_s();
        let velocity = match (self.prev_position, self.prev_time) {
            (Some(prev_pos), Some(prev_t)) if now > prev_t => {
                (pos - prev_pos) as f64 / (now - prev_t)
            }
            _ => 0.0,
        };
        self.prev_position = Some(pos);
        self.prev_time = Some(now);
        velocity
    }

    /// Drive the output at `power` (clamped to [-1, 1]; NaN is neutral).
    /// `None` re-applies the accumulated power. The accumulator is not changed.
    pub fn set_power(&mut self, power: Option<f64>) -> Result<()> {
        let requested = power.unwrap_or(self.accumulated_power);
        let clamped = if requested.is_nan() {
            tracing::warn!("NaN power requested; driving neutral");
            0.0
        } else {
            requested.clamp(-1.0, 1.0)
        };
        let pulse_us = self.mapping.to_pulse(clamped);
        let duty = duty_cycle_percent(pulse_us, self.motor.pwm_frequency_hz);
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("set_duty_cycle")?;
        self.applied_power = clamped;
        self.last_duty = duty;
        tracing::trace!(power = clamped, pulse_us, duty, "output updated");
        Ok(())
    }

    /// Write duty 0 immediately. The accumulated power is kept.
    pub fn stop(&mut self) -> Result<()> {
        self.pwm
            .set_duty_cycle(0.0)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("stop")?;
        self.last_duty = 0.0;
        self.applied_power = 0.0;
        tracing::debug!("output stopped");
        Ok(())
    }

    /// One iteration of the control loop.
    pub fn step_control_loop(&mut self) -> Result<StepReport> {
        let feedback = match self.mode {
            ControlMode::Position => self.decoder.read() as f64,
            ControlMode::Velocity => self.angular_velocity(),
            ControlMode::RawPower => {
                let mut report = self.report(self.decoder.read() as f64, 0.0);
                report.t_s = self.now_s();
                return Ok(report);
            }
        };
        let correction = self.pid.update(feedback, None, None);
        self.accumulated_power += correction;
        self.set_power(None)?;
        let report = self.report(feedback, correction);
        tracing::trace!(
            mode = %report.mode,
            feedback,
            setpoint = report.setpoint,
            correction,
            accumulated = self.accumulated_power,
            duty = report.duty_cycle,
            "control step"
        );
        Ok(report)
    }

    fn report(&self, feedback: f64, correction: f64) -> StepReport {
        StepReport {
            t_s: self.pid.current_time(),
            mode: self.mode,
            feedback,
            setpoint: self.pid.setpoint(),
            correction,
            power: self.applied_power,
            duty_cycle: self.last_duty,
            position: self.decoder.read(),
        }
    }

    pub fn set_pid_coefficients(&mut self, kp: f64, ki: f64, kd: f64) {
        self.pid.set_gains(kp, ki, kd);
        tracing::debug!(kp, ki, kd, "pid gains updated");
    }

    /// Setpoint in ticks (position mode) or ticks/s (velocity mode).
    pub fn set_target(&mut self, target: f64) {
        self.pid.set_setpoint(target);
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            tracing::debug!(from = %self.mode, to = %mode, "control mode changed");
            self.mode = mode;
        }
    }

    pub fn accumulated_power(&self) -> f64 {
        self.accumulated_power
    }

    /// Power currently driving the output, after clamping.
    pub fn applied_power(&self) -> f64 {
        self.applied_power
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn pid_mut(&mut self) -> &mut PidController {
        &mut self.pid
    }

    pub fn pulse_mapping(&self) -> PulseMapping {
        self.mapping
    }

    pub fn motor_cfg(&self) -> MotorCfg {
        self.motor
    }

    /// Last duty cycle successfully written (percent).
    pub fn last_duty_cycle(&self) -> f64 {
        self.last_duty
    }

    /// Shared handle to the decoder fed by the edge handler.
    pub fn decoder(&self) -> Arc<QuadratureDecoder> {
        Arc::clone(&self.decoder)
    }
}
