//! Maps `Box<dyn Error>` from trait boundaries to typed `MotorError`.
//!
//! The traits in `motor_traits` return `Box<dyn Error + Send + Sync>`; this
//! module converts those to the core's error enum, downcasting
//! `motor_hardware::HwError` when the `hardware-errors` feature is on.

use crate::error::MotorError;

/// Map a trait-boundary error to a typed `MotorError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> MotorError {
    #[cfg(feature = "hardware-errors")]
    {
        use motor_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Gpio(msg) => MotorError::Encoder(msg.clone()),
                HwError::Io(io) => MotorError::Io(io.to_string()),
                other => MotorError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("gpio") || lower.contains("encoder") {
        MotorError::Encoder(s)
    } else {
        MotorError::Hardware(s)
    }
}
