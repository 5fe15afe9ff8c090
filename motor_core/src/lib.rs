#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop motor control (hardware-agnostic).
//!
//! All hardware interaction goes through `motor_traits::QuadratureInput` and
//! `motor_traits::PwmOutput`; time comes from an injected `Clock`.
//!
//! ## Architecture
//!
//! - **Decoding**: lock-free quadrature state machine (`quadrature` module)
//! - **Control**: PID with integral clamp and sample gating (`pid` module)
//! - **Output**: power to pulse width to duty cycle (`pulse`, `util`)
//! - **Controller**: mode handling and power accumulation (`MotorCore`)
//! - **Orchestration**: fixed-rate runner, offline simulation, trace sink

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod pid;
pub mod profile;
pub mod pulse;
pub mod quadrature;
pub mod runner;
pub mod simulate;
pub mod telemetry;
pub mod util;

pub use builder::{
    ControlLoop, Missing, MotorController, MotorControllerBuilder, MotorControllerG, Set,
    build_motor_controller,
};
pub use config::{ControlMode, MotorCfg, PidCfg};
pub use controller::{MotorCore, StepReport};
pub use error::{BuildError, MotorError, Report, Result};
pub use pid::{PidController, PidGains};
pub use profile::SetpointProfile;
pub use pulse::PulseMapping;
pub use quadrature::{MAX_POSITION, MIN_POSITION, QuadratureDecoder, transition_delta};
pub use runner::{RunParams, RunSummary};
pub use simulate::{SimParams, TracePoint, simulate_pid};
pub use telemetry::TraceSink;
