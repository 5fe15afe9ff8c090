//! Command implementations: controller construction, control runs and offline simulation.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use eyre::{Result, WrapErr};
use motor_config::{BackendKind, Config, TraceRow};
use motor_core::conversions::sine_profile;
use motor_core::{
    ControlMode, MotorCfg, MotorController, MotorError, PidCfg, PidController, PulseMapping,
    RunParams, RunSummary, SetpointProfile, SimParams, StepReport, TracePoint, TraceSink,
    simulate_pid,
};
use motor_hardware::sim::{self, SimCfg};
use serde_json::json;

/// Queue depth between the control loop and the trace writer.
const TRACE_QUEUE: usize = 4096;

/// Runtime values derived from the validated config.
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    pub motor: MotorCfg,
    pub mapping: PulseMapping,
    pub pid: PidCfg,
    pub mode: ControlMode,
    pub params: RunParams,
}

impl Resolved {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            motor: MotorCfg::from(&cfg.motor),
            mapping: PulseMapping::from(&cfg.driver),
            pid: PidCfg::from(&cfg.pid),
            mode: ControlMode::from(cfg.motor.mode),
            params: RunParams::from(&cfg.runner),
        }
    }

    fn with_duration(mut self, duration_s: Option<f64>) -> Result<Self> {
        if let Some(d) = duration_s {
            if !(d.is_finite() && d > 0.0) {
                return Err(eyre::Report::new(MotorError::Config(format!(
                    "--duration-s must be > 0, got {d}"
                ))));
            }
            self.params.duration_s = d;
        }
        Ok(self)
    }
}

/// Build a controller on the back-end chosen by `[backend]`.
pub fn build_controller(cfg: &Config, r: &Resolved) -> Result<MotorController> {
    match cfg.backend.kind {
        BackendKind::Sim => {
            let (encoder, pwm) = sim::pair(SimCfg {
                ticks_per_sec_at_full: cfg.backend.sim_ticks_per_sec,
                min_pulse_us: r.mapping.min_pulse_us,
                max_pulse_us: r.mapping.max_pulse_us,
                pwm_frequency_hz: r.motor.pwm_frequency_hz,
            });
            tracing::debug!(
                ticks_per_sec = cfg.backend.sim_ticks_per_sec,
                "using simulated back-end"
            );
            MotorController::builder()
                .with_motor(r.motor)
                .with_pulse_mapping(r.mapping)
                .with_pid(r.pid)
                .with_mode(r.mode)
                .with_encoder(encoder)
                .with_pwm(pwm)
                .build()
        }
        BackendKind::Gpio => build_gpio_controller(cfg, r),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn build_gpio_controller(cfg: &Config, r: &Resolved) -> Result<MotorController> {
    use motor_core::hw_error::map_hw_error;
    use motor_hardware::{GpioEncoder, SoftPwm};

    let pins = cfg.pins;
    let encoder = GpioEncoder::new(pins.encoder_a, pins.encoder_b)
        .map_err(|e| eyre::Report::new(map_hw_error(&e)))
        .wrap_err("open encoder pins")?;
    let pwm = SoftPwm::new(pins.pwm, r.motor.pwm_frequency_hz)
        .map_err(|e| eyre::Report::new(map_hw_error(&e)))
        .wrap_err("open pwm pin")?;
    tracing::info!(
        pwm = pins.pwm,
        encoder_a = pins.encoder_a,
        encoder_b = pins.encoder_b,
        "using gpio back-end"
    );
    MotorController::builder()
        .with_motor(r.motor)
        .with_pulse_mapping(r.mapping)
        .with_pid(r.pid)
        .with_mode(r.mode)
        .with_encoder(encoder)
        .with_pwm(pwm)
        .build()
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn build_gpio_controller(_cfg: &Config, _r: &Resolved) -> Result<MotorController> {
    eyre::bail!("gpio back-end not available: rebuild with --features hardware on Linux")
}

/// Spawn a background CSV writer for step traces.
fn spawn_trace(path: &Path) -> Result<TraceSink> {
    let mut wtr = motor_config::trace_csv_writer(path)?;
    Ok(TraceSink::spawn(TRACE_QUEUE, move |p: &TracePoint| {
        wtr.serialize(TraceRow {
            t_s: p.t_s,
            setpoint: p.setpoint,
            feedback: p.feedback,
            output: p.output,
        })?;
        Ok(())
    }))
}

fn trace_point(report: &StepReport) -> TracePoint {
    TracePoint {
        t_s: report.t_s,
        setpoint: report.setpoint,
        feedback: report.feedback,
        output: report.power,
    }
}

/// What a control command is asked to do.
#[derive(Debug, Clone, Copy)]
pub enum Plan {
    /// The sine profile from `[runner]`.
    Sine,
    /// A constant target in revolutions, revolutions/s or raw power, per mode.
    Hold(f64),
}

pub fn run_controller(
    cfg: &Config,
    plan: Plan,
    duration_s: Option<f64>,
    trace: Option<&Path>,
    shutdown: &AtomicBool,
    json_out: bool,
) -> Result<()> {
    let r = Resolved::from_config(cfg).with_duration(duration_s)?;
    let mut controller = build_controller(cfg, &r)?;

    let profile = match plan {
        Plan::Sine => {
            let mut runner = cfg.runner;
            runner.duration_s = r.params.duration_s;
            sine_profile(&runner, &r.motor)
        }
        Plan::Hold(target) => match r.mode {
            ControlMode::Position | ControlMode::Velocity => {
                SetpointProfile::Constant(target * r.motor.ticks_per_revolution)
            }
            ControlMode::RawPower => {
                controller
                    .set_power(Some(target))
                    .wrap_err("apply raw power")?;
                SetpointProfile::Constant(0.0)
            }
        },
    };

    let sink = trace.map(spawn_trace).transpose()?;
    let result = motor_core::runner::run(&mut controller, &profile, r.params, shutdown, |report| {
        if let Some(sink) = &sink {
            sink.record(trace_point(report));
        }
    });
    let dropped = sink.map_or(0, TraceSink::finish);
    if dropped > 0 {
        tracing::warn!(dropped, "trace writer fell behind; points were dropped");
    }

    let summary = result?;
    print_run_summary(&summary, r.mode, dropped, json_out);
    Ok(())
}

fn print_run_summary(s: &RunSummary, mode: ControlMode, dropped: u64, json_out: bool) {
    if json_out {
        let obj = json!({
            "status": if s.interrupted { "interrupted" } else { "complete" },
            "mode": mode.as_str(),
            "steps": s.steps,
            "final_position": s.final_position,
            "final_angle": s.final_angle,
            "final_power": s.final_power,
            "last_error": s.last_error,
            "trace_dropped": dropped,
        });
        println!("{obj}");
    } else {
        let status = if s.interrupted { "interrupted" } else { "complete" };
        println!(
            "run {status}: {} steps in {mode} mode, position {} ticks ({:.3} rev), last error {:.2}",
            s.steps, s.final_position, s.final_angle, s.last_error
        );
    }
}

/// Offline PID run against an ideal integrator, optionally written as CSV.
pub fn simulate(cfg: &Config, trace: Option<&Path>, json_out: bool) -> Result<()> {
    let params = SimParams::from(&cfg.sim);
    let profile = SetpointProfile::Sine {
        amplitude: cfg.sim.initial,
        periods: cfg.runner.periods,
        duration_s: params.sim_time_s,
    };
    let mut pid = PidController::new(
        PidCfg::from(&cfg.pid),
        std::sync::Arc::new(motor_traits::clock::MonotonicClock::new()),
    );
    let points = simulate_pid(&mut pid, &profile, params);

    if let Some(path) = trace {
        let mut wtr = motor_config::trace_csv_writer(path)?;
        for p in &points {
            wtr.serialize(TraceRow {
                t_s: p.t_s,
                setpoint: p.setpoint,
                feedback: p.feedback,
                output: p.output,
            })
            .wrap_err_with(|| format!("write trace CSV {}", path.display()))?;
        }
        wtr.flush()
            .wrap_err_with(|| format!("flush trace CSV {}", path.display()))?;
    }

    let max_abs_error = points
        .iter()
        .map(|p| (p.setpoint - p.feedback).abs())
        .fold(0.0, f64::max);
    let last = points.last().copied();
    if json_out {
        let obj = json!({
            "points": points.len(),
            "final_setpoint": last.map(|p| p.setpoint),
            "final_feedback": last.map(|p| p.feedback),
            "max_abs_error": max_abs_error,
        });
        println!("{obj}");
    } else {
        println!(
            "simulated {} points over {} s; max |error| {:.4}",
            points.len(),
            params.sim_time_s,
            max_abs_error
        );
    }
    Ok(())
}

/// Build against the configured back-end, drive neutral, stop.
pub fn self_check(cfg: &Config, json_out: bool) -> Result<()> {
    let r = Resolved::from_config(cfg);
    let mut controller = build_controller(cfg, &r)?;
    controller.set_power(Some(0.0)).wrap_err("neutral output")?;
    let neutral_duty = controller.last_duty_cycle();
    controller.stop()?;
    let backend = match cfg.backend.kind {
        BackendKind::Sim => "sim",
        BackendKind::Gpio => "gpio",
    };
    if json_out {
        let obj = json!({
            "status": "ok",
            "backend": backend,
            "position": controller.position(),
            "neutral_duty": neutral_duty,
        });
        println!("{obj}");
    } else {
        println!("self-check ok ({backend} back-end, neutral duty {neutral_duty:.2}%)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_picks_presets_and_mode() {
        let cfg = motor_config::load_toml(
            r#"
[motor]
kind = "orbital_20"
mode = "velocity"
[driver]
kind = "spark_mini"
"#,
        )
        .unwrap();
        let r = Resolved::from_config(&cfg);
        assert_eq!(r.motor.ticks_per_revolution, 537.6);
        assert_eq!(r.mapping, PulseMapping::SPARK_MINI);
        assert_eq!(r.mode, ControlMode::Velocity);
    }

    #[test]
    fn duration_override_is_validated() {
        let r = Resolved::from_config(&Config::default());
        assert!(r.with_duration(Some(0.0)).is_err());
        assert!(r.with_duration(Some(f64::NAN)).is_err());
        assert_eq!(r.with_duration(Some(0.5)).unwrap().params.duration_s, 0.5);
        assert_eq!(r.with_duration(None).unwrap().params.duration_s, 10.0);
    }

    #[test]
    fn sim_backend_builds_and_starts_neutral() {
        let cfg = Config::default();
        let r = Resolved::from_config(&cfg);
        let mut c = build_controller(&cfg, &r).unwrap();
        assert_eq!(c.position(), 0);
        c.set_power(Some(0.0)).unwrap();
        assert_eq!(c.last_duty_cycle(), 60.0);
        c.stop().unwrap();
    }

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    #[test]
    fn gpio_backend_without_feature_fails() {
        let cfg = motor_config::load_toml("[backend]\nkind = \"gpio\"\n").unwrap();
        let r = Resolved::from_config(&cfg);
        let err = build_controller(&cfg, &r).unwrap_err();
        assert!(err.to_string().contains("gpio back-end"));
    }
}
