//! Hardware back-ends for the motor control core.
//!
//! - `sim`: kinematic simulation, always available
//! - `gpio`: Raspberry Pi encoder inputs and software PWM (feature `hardware`, Linux)
pub mod error;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use sim::{SimCfg, SimulatedEncoder, SimulatedPwm};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioEncoder, SoftPwm};
