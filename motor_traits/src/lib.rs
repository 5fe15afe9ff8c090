pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at the hardware trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Encoder signal channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    A,
    B,
}

/// Edge notification handler: receives the channel that changed and its new level.
///
/// Invoked from whatever thread the back-end delivers notifications on.
pub type EdgeHandler = Box<dyn Fn(Channel, bool) + Send + Sync + 'static>;

/// Two-channel digital input carrying quadrature encoder signals.
pub trait QuadratureInput {
    /// Current (A, B) levels, `true` = high.
    fn levels(&self) -> Result<(bool, bool), BoxError>;

    /// Register the handler for rising and falling edges on both channels.
    fn subscribe(&mut self, handler: EdgeHandler) -> Result<(), BoxError>;
}

/// Timed output channel driving a motor controller with a PWM duty cycle.
pub trait PwmOutput {
    /// Start the output at the given duty cycle (percent, 0..=100).
    fn start(&mut self, duty_percent: f64) -> Result<(), BoxError>;
    /// Change the duty cycle (percent, 0..=100).
    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError>;
}

impl<T: QuadratureInput + ?Sized> QuadratureInput for Box<T> {
    fn levels(&self) -> Result<(bool, bool), BoxError> {
        (**self).levels()
    }

    fn subscribe(&mut self, handler: EdgeHandler) -> Result<(), BoxError> {
        (**self).subscribe(handler)
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn start(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        (**self).start(duty_percent)
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        (**self).set_duty_cycle(duty_percent)
    }
}
