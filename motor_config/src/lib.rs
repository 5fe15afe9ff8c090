#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and trace CSV handling for the motor controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the defaults.
//! - Trace CSV files (`t_s,setpoint,feedback,output`) are written by the CLI
//!   and can be read back with `load_trace_csv`.
use serde::{Deserialize, Serialize};

/// Trace CSV schema.
///
/// Expected headers:
/// t_s,setpoint,feedback,output
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub t_s: f64,
    pub setpoint: f64,
    pub feedback: f64,
    pub output: f64,
}

pub const TRACE_HEADERS: [&str; 4] = ["t_s", "setpoint", "feedback", "output"];

/// BCM pin numbers for the Raspberry Pi back-end.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Pins {
    pub pwm: u8,
    pub encoder_a: u8,
    pub encoder_b: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            pwm: 12,
            encoder_a: 17,
            encoder_b: 27,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum MotorKind {
    #[serde(rename = "orbital_20", alias = "orbital20")]
    Orbital20,
    #[default]
    #[serde(rename = "gobilda_312", alias = "gobilda312")]
    Gobilda312,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Position,
    Velocity,
    RawPower,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MotorSection {
    /// Preset supplying `ticks_per_revolution` when not given explicitly.
    pub kind: MotorKind,
    pub ticks_per_revolution: Option<f64>,
    pub pwm_frequency_hz: f64,
    pub mode: RunMode,
}

impl Default for MotorSection {
    fn default() -> Self {
        Self {
            kind: MotorKind::default(),
            ticks_per_revolution: None,
            pwm_frequency_hz: 400.0,
            mode: RunMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    SparkMini,
    #[default]
    Gobilda,
}

impl DriverKind {
    /// Preset `(min, max)` pulse widths in microseconds.
    pub const fn pulse_range(self) -> (f64, f64) {
        match self {
            DriverKind::SparkMini => (500.0, 2500.0),
            DriverKind::Gobilda => (1050.0, 1950.0),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct DriverSection {
    /// Preset supplying the pulse range when not given explicitly.
    pub kind: DriverKind,
    pub min_pulse_us: Option<f64>,
    pub max_pulse_us: Option<f64>,
}

impl DriverSection {
    /// Effective `(min, max)` pulse widths: the preset with any overrides applied.
    pub fn pulse_range(&self) -> (f64, f64) {
        let (min, max) = self.kind.pulse_range();
        (
            self.min_pulse_us.unwrap_or(min),
            self.max_pulse_us.unwrap_or(max),
        )
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PidSection {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub windup_guard: f64,
    /// Minimum seconds between computed PID samples.
    pub min_sample_interval_s: f64,
}

impl Default for PidSection {
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

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RunnerSection {
    pub duration_s: f64,
    pub loop_hz: u32,
    /// Sine profile amplitude in output-shaft revolutions.
    pub amplitude_revolutions: f64,
    /// Number of sine periods over the run.
    pub periods: f64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            loop_hz: 100,
            amplitude_revolutions: 1.0,
            periods: 2.0,
        }
    }
}

/// Offline PID simulation parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SimSection {
    pub sim_time_s: f64,
    pub resolution_s: f64,
    pub initial: f64,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            sim_time_s: 10.0,
            resolution_s: 0.01,
            initial: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Kinematic simulation; no hardware needed.
    #[default]
    Sim,
    /// Raspberry Pi GPIO (requires the `hardware` feature).
    Gpio,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    /// Simulated shaft speed at full power, ticks per second.
    pub sim_ticks_per_sec: f64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            sim_ticks_per_sec: 2_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub motor: MotorSection,
    pub driver: DriverSection,
    pub pid: PidSection,
    pub runner: RunnerSection,
    pub sim: SimSection,
    pub backend: BackendSection,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn finite_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn finite_non_negative(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        let p = &self.pins;
        if p.pwm == p.encoder_a || p.pwm == p.encoder_b || p.encoder_a == p.encoder_b {
            eyre::bail!("pins.pwm, pins.encoder_a and pins.encoder_b must be distinct");
        }

        // Motor
        if let Some(t) = self.motor.ticks_per_revolution {
            if !finite_positive(t) {
                eyre::bail!("motor.ticks_per_revolution must be > 0");
            }
        }
        if !finite_positive(self.motor.pwm_frequency_hz) {
            eyre::bail!("motor.pwm_frequency_hz must be > 0");
        }

        // Driver: overrides are checked on their own, then the resolved range
        if let Some(v) = self.driver.min_pulse_us {
            if !finite_positive(v) {
                eyre::bail!("driver.min_pulse_us must be > 0");
            }
        }
        if let Some(v) = self.driver.max_pulse_us {
            if !finite_positive(v) {
                eyre::bail!("driver.max_pulse_us must be > 0");
            }
        }
        let (lo, hi) = self.driver.pulse_range();
        if lo >= hi {
            eyre::bail!(
                "driver.min_pulse_us must be < driver.max_pulse_us (resolved {lo} >= {hi})"
            );
        }
        let period_us = 1_000_000.0 / self.motor.pwm_frequency_hz;
        if hi > period_us {
            eyre::bail!("driver.max_pulse_us ({hi}) exceeds the pwm period ({period_us} us)");
        }

        // PID
        let pid = &self.pid;
        if !(pid.kp.is_finite() && pid.ki.is_finite() && pid.kd.is_finite()) {
            eyre::bail!("pid gains must be finite");
        }
        if !finite_non_negative(pid.windup_guard) {
            eyre::bail!("pid.windup_guard must be >= 0");
        }
        if !finite_non_negative(pid.min_sample_interval_s) {
            eyre::bail!("pid.min_sample_interval_s must be >= 0");
        }

        // Runner
        if !finite_positive(self.runner.duration_s) {
            eyre::bail!("runner.duration_s must be > 0");
        }
        if self.runner.loop_hz == 0 {
            eyre::bail!("runner.loop_hz must be > 0");
        }
        if self.runner.loop_hz > 10_000 {
            eyre::bail!("runner.loop_hz is unreasonably large (>10kHz)");
        }
        if !self.runner.amplitude_revolutions.is_finite() || !self.runner.periods.is_finite() {
            eyre::bail!("runner.amplitude_revolutions and runner.periods must be finite");
        }

        // Simulation
        if !finite_positive(self.sim.sim_time_s) {
            eyre::bail!("sim.sim_time_s must be > 0");
        }
        if !finite_positive(self.sim.resolution_s) {
            eyre::bail!("sim.resolution_s must be > 0");
        }
        if self.sim.resolution_s > self.sim.sim_time_s {
            eyre::bail!("sim.resolution_s must not exceed sim.sim_time_s");
        }
        if !self.sim.initial.is_finite() {
            eyre::bail!("sim.initial must be finite");
        }

        // Backend
        if !finite_positive(self.backend.sim_ticks_per_sec) {
            eyre::bail!("backend.sim_ticks_per_sec must be > 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
            }
        }
        Ok(())
    }
}

/// Create a CSV writer for trace rows; the header row is written with the first record.
pub fn trace_csv_writer(path: &std::path::Path) -> eyre::Result<csv::Writer<std::fs::File>> {
    csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("create trace CSV {:?}: {}", path, e))
}

pub fn load_trace_csv(path: &std::path::Path) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open trace CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TRACE_HEADERS {
        eyre::bail!(
            "trace CSV must have headers '{}', got: {}",
            TRACE_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}
