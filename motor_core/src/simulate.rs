//! Offline PID simulation: the controller's output is integrated straight
//! into the feedback value, with no plant in between. Useful for tuning gains
//! without hardware.

use crate::pid::PidController;
use crate::profile::SetpointProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub sim_time_s: f64,
    pub resolution_s: f64,
    /// Starting feedback value.
    pub initial: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            sim_time_s: 10.0,
            resolution_s: 0.01,
            initial: 10.0,
        }
    }
}

/// One sample of a control trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    pub t_s: f64,
    pub setpoint: f64,
    pub feedback: f64,
    pub output: f64,
}

/// Step `pid` from `t = 0` until `sim_time_s`, adding each output to the
/// feedback. A non-positive or non-finite resolution yields an empty trace.
pub fn simulate_pid(
    pid: &mut PidController,
    profile: &SetpointProfile,
    params: SimParams,
) -> Vec<TracePoint> {
    if !params.resolution_s.is_finite() || params.resolution_s <= 0.0 || !params.sim_time_s.is_finite()
    {
        tracing::warn!(?params, "invalid simulation parameters");
        return Vec::new();
    }
    let capacity = (params.sim_time_s / params.resolution_s).ceil().max(0.0) as usize;
    let mut trace = Vec::with_capacity(capacity);
    let mut value = params.initial;
    let mut i: u64 = 0;
    loop {
        let t = i as f64 * params.resolution_s;
        if t >= params.sim_time_s {
            break;
        }
        let setpoint = profile.at(t);
        let output = pid.update(value, Some(setpoint), Some(t));
        value += output;
        trace.push(TracePoint {
            t_s: pid.current_time(),
            setpoint,
            feedback: value,
            output,
        });
        i += 1;
    }
    tracing::debug!(points = trace.len(), final_value = value, "simulation finished");
    trace
}
