//! Simulated encoder + PWM pair backed by a kinematic model.
//!
//! The PWM side maps each commanded duty cycle back to a power level; the
//! plant integrates `power * ticks_per_sec_at_full` over clock time and emits
//! one quadrature edge per whole tick through the encoder's subscribed handler.
//! Nothing about motor electrics is modelled.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use motor_traits::clock::{Clock, MonotonicClock};
use motor_traits::{BoxError, Channel, EdgeHandler, PwmOutput, QuadratureInput};
use tracing::trace;

use crate::error::HwError;

/// Upper bound on edges emitted per plant update.
const MAX_EDGES_PER_UPDATE: u64 = 100_000;

/// Gray-code order of (A, B) levels for forward rotation.
const PHASES: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];

#[derive(Debug, Clone)]
pub struct SimCfg {
    /// Encoder ticks per second at full forward power.
    pub ticks_per_sec_at_full: f64,
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
    pub pwm_frequency_hz: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            ticks_per_sec_at_full: 2_000.0,
            min_pulse_us: 1050.0,
            max_pulse_us: 1950.0,
            pwm_frequency_hz: 400.0,
        }
    }
}

impl SimCfg {
    /// Power in [-1, 1] implied by a duty cycle. Duty 0 means the output is off.
    pub fn duty_to_power(&self, duty_percent: f64) -> f64 {
        if !duty_percent.is_finite() || duty_percent <= 0.0 || self.pwm_frequency_hz <= 0.0 {
            return 0.0;
        }
        let pulse_us = duty_percent / 100.0 / self.pwm_frequency_hz * 1_000_000.0;
        let half = (self.max_pulse_us - self.min_pulse_us) / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let mid = self.min_pulse_us + half;
        ((pulse_us - mid) / half).clamp(-1.0, 1.0)
    }
}

struct Plant {
    cfg: SimCfg,
    position: i64,
    fractional: f64,
    phase: usize,
    power: f64,
    duty: f64,
    started: bool,
    last_update: Option<Instant>,
    handler: Option<EdgeHandler>,
}

impl Plant {
    fn step(&mut self, ticks: i64) {
        let forward = ticks >= 0;
        let n = ticks.unsigned_abs().min(MAX_EDGES_PER_UPDATE);
        for _ in 0..n {
            let prev = PHASES[self.phase];
            self.phase = if forward {
                (self.phase + 1) % 4
            } else {
                (self.phase + 3) % 4
            };
            let next = PHASES[self.phase];
            self.position += if forward { 1 } else { -1 };
            if let Some(h) = &self.handler {
                if prev.0 != next.0 {
                    h(Channel::A, next.0);
                } else {
                    h(Channel::B, next.1);
                }
            }
        }
    }

    fn advance(&mut self, now: Instant) {
        if let Some(last) = self.last_update {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            let travel = self.power * self.cfg.ticks_per_sec_at_full * dt + self.fractional;
            let whole = travel.trunc();
            self.fractional = travel - whole;
            if whole != 0.0 {
                self.step(whole as i64);
            }
        }
        self.last_update = Some(now);
    }
}

struct Shared {
    plant: Mutex<Plant>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Plant> {
        self.plant.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Encoder side of the simulation.
#[derive(Clone)]
pub struct SimulatedEncoder {
    shared: Arc<Shared>,
}

/// PWM side of the simulation.
#[derive(Clone)]
pub struct SimulatedPwm {
    shared: Arc<Shared>,
}

/// Build a connected encoder/PWM pair using the real monotonic clock.
pub fn pair(cfg: SimCfg) -> (SimulatedEncoder, SimulatedPwm) {
    pair_with_clock(cfg, Arc::new(MonotonicClock::new()))
}

/// Build a connected encoder/PWM pair on an injected clock.
pub fn pair_with_clock(
    cfg: SimCfg,
    clock: Arc<dyn Clock + Send + Sync>,
) -> (SimulatedEncoder, SimulatedPwm) {
    let shared = Arc::new(Shared {
        plant: Mutex::new(Plant {
            cfg,
            position: 0,
            fractional: 0.0,
            phase: 0,
            power: 0.0,
            duty: 0.0,
            started: false,
            last_update: None,
            handler: None,
        }),
        clock,
    });
    (
        SimulatedEncoder {
            shared: Arc::clone(&shared),
        },
        SimulatedPwm { shared },
    )
}

impl SimulatedEncoder {
    /// Move the shaft by `ticks` (signed), emitting one edge per tick.
    pub fn step(&self, ticks: i64) {
        self.shared.lock().step(ticks);
    }

    /// Integrate the plant up to the clock's current time.
    pub fn sync(&self) {
        let now = self.shared.clock.now();
        self.shared.lock().advance(now);
    }

    /// Ground-truth shaft position in ticks.
    pub fn true_position(&self) -> i64 {
        self.shared.lock().position
    }
}

impl QuadratureInput for SimulatedEncoder {
    fn levels(&self) -> Result<(bool, bool), BoxError> {
        let plant = self.shared.lock();
        Ok(PHASES[plant.phase])
    }

    fn subscribe(&mut self, handler: EdgeHandler) -> Result<(), BoxError> {
        let mut plant = self.shared.lock();
        if plant.handler.is_some() {
            return Err(Box::new(HwError::AlreadySubscribed));
        }
        plant.handler = Some(handler);
        Ok(())
    }
}

impl SimulatedPwm {
    /// Last duty cycle written (percent).
    pub fn duty_cycle(&self) -> f64 {
        self.shared.lock().duty
    }

    /// Power level the plant is currently applying.
    pub fn power(&self) -> f64 {
        self.shared.lock().power
    }

    pub fn is_started(&self) -> bool {
        self.shared.lock().started
    }

    fn apply(&mut self, duty_percent: f64) {
        let now = self.shared.clock.now();
        let mut plant = self.shared.lock();
        plant.advance(now);
        plant.duty = duty_percent;
        plant.power = plant.cfg.duty_to_power(duty_percent);
        trace!(duty = duty_percent, power = plant.power, "sim pwm update");
    }
}

impl PwmOutput for SimulatedPwm {
    fn start(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        self.shared.lock().started = true;
        self.apply(duty_percent);
        Ok(())
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        if !(0.0..=100.0).contains(&duty_percent) {
            return Err(Box::new(HwError::Pwm(format!(
                "duty cycle {duty_percent} outside 0..=100"
            ))));
        }
        self.apply(duty_percent);
        Ok(())
    }
}
