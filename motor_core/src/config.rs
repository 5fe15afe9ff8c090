//! Runtime configuration types for the control loop.
//!
//! These are the structs consumed by `MotorController` and the builder. They
//! are separate from the TOML-deserialized config in `motor_config`.

/// PID gains and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidCfg {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Integral clamp magnitude.
    pub windup_guard: f64,
    /// Updates closer together than this (seconds) return the previous output.
    pub min_sample_interval_s: f64,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 0.2,
            ki: 0.0,
            kd: 0.0,
            windup_guard: 20.0,
            min_sample_interval_s: 0.0,
        }
    }
}

/// Motor/encoder characteristics and the PWM carrier frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCfg {
    /// Encoder ticks per output-shaft revolution (after gearing).
    pub ticks_per_revolution: f64,
    pub pwm_frequency_hz: f64,
}

impl MotorCfg {
    /// Orbital 20 gearmotor.
    pub const fn orbital_20() -> Self {
        Self {
            ticks_per_revolution: 537.6,
            pwm_frequency_hz: 400.0,
        }
    }

    /// goBILDA 5203 series, 312 rpm.
    pub const fn gobilda_312() -> Self {
        Self {
            ticks_per_revolution: 537.7,
            pwm_frequency_hz: 400.0,
        }
    }
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self::orbital_20()
    }
}

/// What the PID loop regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlMode {
    /// Encoder position in ticks.
    #[default]
    Position,
    /// Angular velocity in ticks per second.
    Velocity,
    /// No closed loop; the output follows `set_power`.
    RawPower,
}

impl ControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::RawPower => "raw_power",
        }
    }
}

impl core::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
