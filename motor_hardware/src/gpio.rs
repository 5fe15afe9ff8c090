use std::sync::Arc;

use motor_traits::{BoxError, Channel, EdgeHandler, PwmOutput, QuadratureInput};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

/// Quadrature encoder on two GPIO inputs, notified through rppal's async interrupts.
pub struct GpioEncoder {
    a: InputPin,
    b: InputPin,
    subscribed: bool,
}

impl GpioEncoder {
    pub fn new(pin_a: u8, pin_b: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let a = gpio
            .get(pin_a)
            .map_err(|e| HwError::Gpio(format!("open encoder pin A ({pin_a}): {e}")))?
            .into_input();
        let b = gpio
            .get(pin_b)
            .map_err(|e| HwError::Gpio(format!("open encoder pin B ({pin_b}): {e}")))?
            .into_input();
        debug!(pin_a, pin_b, "encoder pins opened");
        Ok(Self {
            a,
            b,
            subscribed: false,
        })
    }
}

impl QuadratureInput for GpioEncoder {
    fn levels(&self) -> std::result::Result<(bool, bool), BoxError> {
        Ok((self.a.is_high(), self.b.is_high()))
    }

    fn subscribe(&mut self, handler: EdgeHandler) -> std::result::Result<(), BoxError> {
        if self.subscribed {
            return Err(Box::new(HwError::AlreadySubscribed));
        }
        let handler = Arc::new(handler);
        let on_a = Arc::clone(&handler);
        self.a
            .set_async_interrupt(Trigger::Both, move |level: Level| {
                on_a(Channel::A, level == Level::High);
            })
            .map_err(|e| HwError::Gpio(format!("encoder pin A interrupt: {e}")))?;
        let on_b = handler;
        self.b
            .set_async_interrupt(Trigger::Both, move |level: Level| {
                on_b(Channel::B, level == Level::High);
            })
            .map_err(|e| HwError::Gpio(format!("encoder pin B interrupt: {e}")))?;
        self.subscribed = true;
        Ok(())
    }
}

/// Software PWM on a single GPIO output.
pub struct SoftPwm {
    pin: OutputPin,
    frequency_hz: f64,
}

impl SoftPwm {
    pub fn new(pin: u8, frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut pin_out = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open pwm pin ({pin}): {e}")))?
            .into_output();
        pin_out.set_low();
        Ok(Self {
            pin: pin_out,
            frequency_hz,
        })
    }

    fn write(&mut self, duty_percent: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&duty_percent) {
            return Err(HwError::Pwm(format!(
                "duty cycle {duty_percent} outside 0..=100"
            )));
        }
        trace!(duty = duty_percent, "soft pwm update");
        self.pin
            .set_pwm_frequency(self.frequency_hz, duty_percent / 100.0)
            .map_err(|e| HwError::Pwm(e.to_string()))
    }
}

impl PwmOutput for SoftPwm {
    fn start(&mut self, duty_percent: f64) -> std::result::Result<(), BoxError> {
        debug!(frequency_hz = self.frequency_hz, "soft pwm start");
        Ok(self.write(duty_percent)?)
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> std::result::Result<(), BoxError> {
        Ok(self.write(duty_percent)?)
    }
}
