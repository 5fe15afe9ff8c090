//! PID controller with integral clamping and a minimum sample interval.
//!
//! Times are seconds on the controller's own timescale: `0.0` is the instant
//! the controller was constructed (per its injected clock). Callers that pass
//! explicit times to `update` may use any consistent timescale.

use std::sync::Arc;
use std::time::Instant;

use motor_traits::clock::{Clock, MonotonicClock};

use crate::config::PidCfg;

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

pub struct PidController {
    gains: PidGains,
    setpoint: f64,
    integral: f64,
    last_error: f64,
    last_time: f64,
    current_time: f64,
    windup_guard: f64,
    min_sample_interval: f64,
    output: f64,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl core::fmt::Debug for PidController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PidController")
            .field("gains", &self.gains)
            .field("setpoint", &self.setpoint)
            .field("integral", &self.integral)
            .field("last_error", &self.last_error)
            .field("last_time", &self.last_time)
            .field("windup_guard", &self.windup_guard)
            .field("min_sample_interval", &self.min_sample_interval)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(PidCfg::default(), Arc::new(MonotonicClock::new()))
    }
}

impl PidController {
    /// Controller whose timescale starts now on `clock`.
    pub fn new(cfg: PidCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self::with_epoch(cfg, clock, epoch)
    }

    /// Controller sharing an existing epoch (e.g. its owning motor controller's).
    pub fn with_epoch(cfg: PidCfg, clock: Arc<dyn Clock + Send + Sync>, epoch: Instant) -> Self {
        let start = clock.secs_since(epoch);
        Self {
            gains: PidGains {
                kp: cfg.kp,
                ki: cfg.ki,
                kd: cfg.kd,
            },
            setpoint: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_time: start,
            current_time: start,
            windup_guard: cfg.windup_guard.abs(),
            min_sample_interval: cfg.min_sample_interval_s,
            output: 0.0,
            clock,
            epoch,
        }
    }

    /// Compute the correction for `feedback`.
    ///
    /// `setpoint`, when given and finite, replaces the stored setpoint; a
    /// non-finite one is ignored and the stored setpoint is kept. `at` defaults to
    /// the injected clock. If less than the minimum sample interval has passed
    /// since the last computed sample, the previous output is returned as is.
    pub fn update(&mut self, feedback: f64, setpoint: Option<f64>, at: Option<f64>) -> f64 {
        if let Some(sp) = setpoint {
            self.set_setpoint(sp);
        }
        let now = at.unwrap_or_else(|| self.clock.secs_since(self.epoch));
        self.current_time = now;

        let error = self.setpoint - feedback;
        if !error.is_finite() || !now.is_finite() {
            tracing::warn!(feedback, setpoint = self.setpoint, at = now, "non-finite pid input; holding output");
            return self.output;
        }

        let dt = now - self.last_time;
        if dt < self.min_sample_interval {
            tracing::trace!(dt, min = self.min_sample_interval, "pid sample gated");
            return self.output;
        }
        let de = error - self.last_error;

        let p_term = self.gains.kp * error;
        self.integral += error * dt;
        if self.integral < -self.windup_guard {
            self.integral = -self.windup_guard;
        } else if self.integral > self.windup_guard {
            self.integral = self.windup_guard;
        }
        let d_term = if dt > 0.0 { de / dt } else { 0.0 };

        self.last_time = now;
        self.last_error = error;
        self.output = p_term + self.gains.ki * self.integral + self.gains.kd * d_term;
        tracing::trace!(error, dt, p_term, integral = self.integral, d_term, output = self.output, "pid update");
        self.output
    }

    /// Zero the transient state; gains, windup guard and sample interval are kept.
    pub fn reset(&mut self) {
        self.setpoint = 0.0;
        self.integral = 0.0;
        self.last_error = 0.0;
        self.output = 0.0;
    }

    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.gains = PidGains { kp, ki, kd };
    }

    /// Non-finite setpoints are rejected; the previous setpoint stays in force.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        if setpoint.is_finite() {
            self.setpoint = setpoint;
        } else {
            tracing::warn!(setpoint, kept = self.setpoint, "non-finite setpoint ignored");
        }
    }

    /// Set the integral clamp. Its magnitude is used, so the clamp range is never inverted.
    pub fn set_windup_guard(&mut self, guard: f64) {
        self.windup_guard = guard.abs();
    }

    pub fn set_min_sample_interval(&mut self, secs: f64) {
        self.min_sample_interval = secs;
    }

    /// Time seen by the most recent `update` (construction time before any update).
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn windup_guard(&self) -> f64 {
        self.windup_guard
    }

    pub fn min_sample_interval(&self) -> f64 {
        self.min_sample_interval
    }

    /// Last computed output.
    pub fn output(&self) -> f64 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_traits::clock::test_clock::TestClock;
    use std::time::Duration;

    fn pid(kp: f64, ki: f64, kd: f64) -> (PidController, TestClock) {
        let clock = TestClock::new();
        let cfg = PidCfg {
            kp,
            ki,
            kd,
            ..PidCfg::default()
        };
        (PidController::new(cfg, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn proportional_only_scenario() {
        let (mut c, _clock) = pid(1.0, 0.0, 0.0);
        assert_eq!(c.update(0.0, Some(10.0), Some(0.0)), 10.0);
        assert_eq!(c.update(10.0, None, Some(1.0)), 0.0);
    }

    #[test]
    fn first_update_is_relative_to_construction() {
        let (mut c, clock) = pid(0.0, 1.0, 0.0);
        c.set_setpoint(2.0);
        clock.advance(Duration::from_millis(500));
        // integral = 2.0 * 0.5
        let out = c.update(0.0, None, None);
        assert!((out - 1.0).abs() < 1e-12, "got {out}");
        assert!((c.current_time() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn derivative_term_uses_error_slope() {
        let (mut c, _clock) = pid(0.0, 0.0, 1.0);
        c.update(0.0, Some(1.0), Some(1.0)); // error 1, de 1, dt 1
        let out = c.update(0.0, Some(3.0), Some(2.0)); // error 3, de 2, dt 1
        assert!((out - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_dt_skips_derivative() {
        let (mut c, _clock) = pid(0.0, 0.0, 5.0);
        let out = c.update(0.0, Some(4.0), Some(0.0));
        assert_eq!(out, 0.0);
    }

    #[test]
    fn reset_keeps_tuning() {
        let (mut c, _clock) = pid(2.0, 1.0, 0.5);
        c.set_windup_guard(3.0);
        c.set_min_sample_interval(0.25);
        c.update(1.0, Some(9.0), Some(1.0));
        c.reset();
        assert_eq!(c.setpoint(), 0.0);
        assert_eq!(c.integral(), 0.0);
        assert_eq!(c.output(), 0.0);
        assert_eq!(c.gains(), PidGains { kp: 2.0, ki: 1.0, kd: 0.5 });
        assert_eq!(c.windup_guard(), 3.0);
        assert_eq!(c.min_sample_interval(), 0.25);
    }

    #[test]
    fn non_finite_feedback_holds_output() {
        let (mut c, _clock) = pid(1.0, 0.0, 0.0);
        let first = c.update(1.0, Some(4.0), Some(1.0));
        let held = c.update(f64::NAN, None, Some(2.0));
        assert_eq!(first, held);
        assert_eq!(c.integral(), 3.0);
    }

    #[test]
    fn non_finite_setpoint_is_not_stored() {
        let (mut c, _clock) = pid(1.0, 0.0, 0.0);
        assert_eq!(c.update(0.0, Some(2.0), Some(0.0)), 2.0);
        // the stored setpoint keeps driving the output
        assert_eq!(c.update(1.0, Some(f64::NAN), Some(1.0)), 1.0);
        assert_eq!(c.setpoint(), 2.0);
        assert_eq!(c.update(2.0, None, Some(2.0)), 0.0);

        c.set_setpoint(f64::INFINITY);
        assert_eq!(c.setpoint(), 2.0);
        assert_eq!(c.update(3.0, None, Some(3.0)), -1.0);
    }

    #[test]
    fn negative_windup_guard_is_normalised() {
        let (mut c, _clock) = pid(0.0, 1.0, 0.0);
        c.set_windup_guard(-2.0);
        let out = c.update(0.0, Some(100.0), Some(10.0));
        assert_eq!(out, 2.0);
    }
}
