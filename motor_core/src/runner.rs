//! Fixed-rate control loop: follow a setpoint profile for a bounded time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use motor_traits::clock::{Clock, MonotonicClock};

use crate::builder::ControlLoop;
use crate::controller::StepReport;
use crate::error::Result;
use crate::profile::SetpointProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub duration_s: f64,
    pub loop_hz: u32,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            loop_hz: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub final_position: i64,
    /// Revolutions.
    pub final_angle: f64,
    /// Power applied on the last step, before the final stop.
    pub final_power: f64,
    /// Setpoint minus feedback on the last step.
    pub last_error: f64,
    /// The shutdown flag ended the run early.
    pub interrupted: bool,
}

/// Run on the real monotonic clock.
pub fn run<C, F>(
    controller: &mut C,
    profile: &SetpointProfile,
    params: RunParams,
    shutdown: &AtomicBool,
    observer: F,
) -> Result<RunSummary>
where
    C: ControlLoop + ?Sized,
    F: FnMut(&StepReport),
{
    run_with_clock(
        controller,
        profile,
        params,
        shutdown,
        &MonotonicClock::new(),
        observer,
    )
}

/// Step `controller` at `params.loop_hz`, feeding it `profile` until
/// `params.duration_s` has elapsed on `clock` or `shutdown` is raised. The
/// output is stopped before returning, on success and on error.
pub fn run_with_clock<C, F>(
    controller: &mut C,
    profile: &SetpointProfile,
    params: RunParams,
    shutdown: &AtomicBool,
    clock: &dyn Clock,
    mut observer: F,
) -> Result<RunSummary>
where
    C: ControlLoop + ?Sized,
    F: FnMut(&StepReport),
{
    let period = Duration::from_micros(crate::util::period_us(params.loop_hz));
    let epoch = clock.now();
    let mut steps: u64 = 0;
    let mut last_error = 0.0;
    let mut final_power = 0.0;
    let mut interrupted = false;

    tracing::info!(
        duration_s = params.duration_s,
        loop_hz = params.loop_hz,
        ?profile,
        "control run start"
    );

    loop {
        if shutdown.load(Ordering::Relaxed) {
            interrupted = true;
            tracing::info!(steps, "shutdown requested");
            break;
        }
        let t = clock.secs_since(epoch);
        if t >= params.duration_s {
            break;
        }

        controller.set_target(profile.at(t));
        let tick = clock.now();
        let report = match controller.step_control_loop() {
            Ok(r) => r,
            Err(e) => {
                if let Err(stop_err) = controller.stop() {
                    tracing::warn!(error = %stop_err, "stop failed after control error");
                }
                tracing::error!(error = %e, steps, "control run aborted");
                return Err(e);
            }
        };
        steps += 1;
        last_error = report.setpoint - report.feedback;
        final_power = report.power;
        observer(&report);

        let spent = clock.now().saturating_duration_since(tick);
        if let Some(rest) = period.checked_sub(spent) {
            clock.sleep(rest);
        } else {
            tracing::trace!(?spent, ?period, "control step overran its period");
        }
    }

    controller.stop()?;

    let summary = RunSummary {
        steps,
        final_position: controller.position(),
        final_angle: controller.angle(),
        final_power,
        last_error,
        interrupted,
    };
    tracing::info!(
        steps,
        final_position = summary.final_position,
        final_angle = summary.final_angle,
        last_error,
        interrupted,
        "control run end"
    );
    Ok(summary)
}
