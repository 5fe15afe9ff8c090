//! Time and PWM arithmetic helpers shared by the controller and the runner.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Compute the period in microseconds for a given loop rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Duty cycle (percent) of a `pulse_us` pulse repeated at `frequency_hz`,
/// clamped to `0..=100`. Non-finite inputs give 0.
#[inline]
pub fn duty_cycle_percent(pulse_us: f64, frequency_hz: f64) -> f64 {
    let duty = pulse_us / MICROS_PER_SEC as f64 * frequency_hz * 100.0;
    if duty.is_finite() {
        duty.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
