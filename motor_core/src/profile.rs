//! Setpoint profiles the runner and simulator follow over time.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetpointProfile {
    /// Hold one value.
    Constant(f64),
    /// `amplitude * sin(periods * PI * t / (duration_s / 2))`.
    Sine {
        amplitude: f64,
        periods: f64,
        duration_s: f64,
    },
}

impl SetpointProfile {
    /// Setpoint at `t` seconds into the run.
    pub fn at(&self, t: f64) -> f64 {
        match *self {
            Self::Constant(v) => v,
            Self::Sine {
                amplitude,
                periods,
                duration_s,
            } => {
                if duration_s <= 0.0 {
                    return 0.0;
                }
                amplitude * (periods * PI * t / (duration_s / 2.0)).sin()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.25, 100.0)]
    #[case(2.5, 0.0)]
    #[case(3.75, -100.0)]
    fn sine_hits_quarter_points(#[case] t: f64, #[case] expected: f64) {
        let p = SetpointProfile::Sine {
            amplitude: 100.0,
            periods: 2.0,
            duration_s: 10.0,
        };
        assert!((p.at(t) - expected).abs() < 1e-9, "t={t} got {}", p.at(t));
    }

    #[test]
    fn degenerate_duration_is_flat() {
        let p = SetpointProfile::Sine {
            amplitude: 5.0,
            periods: 1.0,
            duration_s: 0.0,
        };
        assert_eq!(p.at(3.0), 0.0);
        assert_eq!(SetpointProfile::Constant(7.5).at(99.0), 7.5);
    }
}
