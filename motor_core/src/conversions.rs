//! `From` implementations bridging `motor_config` types to `motor_core` types.

use crate::config::{ControlMode, MotorCfg, PidCfg};
use crate::profile::SetpointProfile;
use crate::pulse::PulseMapping;
use crate::runner::RunParams;
use crate::simulate::SimParams;

// ── PidCfg ───────────────────────────────────────────────────────────────────

impl From<&motor_config::PidSection> for PidCfg {
    fn from(c: &motor_config::PidSection) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
            windup_guard: c.windup_guard,
            min_sample_interval_s: c.min_sample_interval_s,
        }
    }
}

// ── MotorCfg ─────────────────────────────────────────────────────────────────

impl From<&motor_config::MotorSection> for MotorCfg {
    fn from(c: &motor_config::MotorSection) -> Self {
        let preset = match c.kind {
            motor_config::MotorKind::Orbital20 => MotorCfg::orbital_20(),
            motor_config::MotorKind::Gobilda312 => MotorCfg::gobilda_312(),
        };
        Self {
            ticks_per_revolution: c.ticks_per_revolution.unwrap_or(preset.ticks_per_revolution),
            pwm_frequency_hz: c.pwm_frequency_hz,
        }
    }
}

// ── PulseMapping ─────────────────────────────────────────────────────────────

impl From<&motor_config::DriverSection> for PulseMapping {
    fn from(c: &motor_config::DriverSection) -> Self {
        let (min, max) = c.pulse_range();
        PulseMapping::new(min, max)
    }
}

// ── ControlMode ──────────────────────────────────────────────────────────────

impl From<motor_config::RunMode> for ControlMode {
    fn from(m: motor_config::RunMode) -> Self {
        match m {
            motor_config::RunMode::Position => ControlMode::Position,
            motor_config::RunMode::Velocity => ControlMode::Velocity,
            motor_config::RunMode::RawPower => ControlMode::RawPower,
        }
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

impl From<&motor_config::RunnerSection> for RunParams {
    fn from(c: &motor_config::RunnerSection) -> Self {
        Self {
            duration_s: c.duration_s,
            loop_hz: c.loop_hz,
        }
    }
}

/// Sine profile of `revolutions` amplitude for the configured motor.
pub fn sine_profile(runner: &motor_config::RunnerSection, motor: &MotorCfg) -> SetpointProfile {
    SetpointProfile::Sine {
        amplitude: runner.amplitude_revolutions * motor.ticks_per_revolution,
        periods: runner.periods,
        duration_s: runner.duration_s,
    }
}

// ── Simulation ───────────────────────────────────────────────────────────────

impl From<&motor_config::SimSection> for SimParams {
    fn from(c: &motor_config::SimSection) -> Self {
        Self {
            sim_time_s: c.sim_time_s,
            resolution_s: c.resolution_s,
            initial: c.initial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motor_config::{DriverKind, DriverSection};

    #[test]
    fn driver_presets_match_pulse_mappings() {
        for (kind, mapping) in [
            (DriverKind::SparkMini, PulseMapping::SPARK_MINI),
            (DriverKind::Gobilda, PulseMapping::GOBILDA),
        ] {
            let section = DriverSection {
                kind,
                ..DriverSection::default()
            };
            assert_eq!(PulseMapping::from(&section), mapping);
        }
    }

    #[test]
    fn driver_override_replaces_one_end_of_the_preset() {
        let section = DriverSection {
            kind: DriverKind::SparkMini,
            min_pulse_us: None,
            max_pulse_us: Some(2000.0),
        };
        assert_eq!(PulseMapping::from(&section), PulseMapping::new(500.0, 2000.0));
    }
}
