//! Power to pulse-width mapping for servo-style motor drivers.

/// Linear map from power in `[-1, 1]` to a pulse width in microseconds,
/// centred on the midpoint of `(min_pulse_us, max_pulse_us)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseMapping {
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
}

impl PulseMapping {
    /// REV Spark Mini.
    pub const SPARK_MINI: Self = Self::new(500.0, 2500.0);
    /// goBILDA servo-style motor controller.
    pub const GOBILDA: Self = Self::new(1050.0, 1950.0);

    pub const fn new(min_pulse_us: f64, max_pulse_us: f64) -> Self {
        Self {
            min_pulse_us,
            max_pulse_us,
        }
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        (self.max_pulse_us - self.min_pulse_us) / 2.0
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        self.min_pulse_us + self.half_width()
    }

    /// Pulse width for `power`. Callers clamp; values outside `[-1, 1]` extrapolate.
    #[inline]
    pub fn to_pulse(&self, power: f64) -> f64 {
        power * self.half_width() + self.midpoint()
    }

    /// Inverse of [`to_pulse`](Self::to_pulse). A zero-width range maps to 0.
    #[inline]
    pub fn to_power(&self, pulse_us: f64) -> f64 {
        let half = self.half_width();
        if half == 0.0 {
            return 0.0;
        }
        (pulse_us - self.midpoint()) / half
    }
}

impl Default for PulseMapping {
    fn default() -> Self {
        Self::GOBILDA
    }
}
