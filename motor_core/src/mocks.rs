//! Test and helper back-ends for motor_core.

use std::sync::{Arc, Mutex};

use motor_traits::{BoxError, Channel, EdgeHandler, PwmOutput, QuadratureInput};

/// Encoder that never moves; edges can be injected by hand through `fire`.
#[derive(Clone, Default)]
pub struct ManualEncoder {
    levels: (bool, bool),
    handler: Arc<Mutex<Option<EdgeHandler>>>,
}

impl ManualEncoder {
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            levels: (a, b),
            handler: Arc::default(),
        }
    }

    /// Deliver one edge to the subscribed handler. Returns false when nothing is subscribed.
    pub fn fire(&self, channel: Channel, level: bool) -> bool {
        match self.handler.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(h) => {
                    h(channel, level);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl QuadratureInput for ManualEncoder {
    fn levels(&self) -> Result<(bool, bool), BoxError> {
        Ok(self.levels)
    }

    fn subscribe(&mut self, handler: EdgeHandler) -> Result<(), BoxError> {
        let mut slot = self
            .handler
            .lock()
            .map_err(|_| Box::new(std::io::Error::other("handler lock poisoned")) as BoxError)?;
        *slot = Some(handler);
        Ok(())
    }
}

/// PWM output that records every duty cycle written.
#[derive(Clone, Default)]
pub struct RecordingPwm {
    writes: Arc<Mutex<Vec<f64>>>,
    fail_after: Option<usize>,
}

impl RecordingPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// An output whose every write fails.
    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    /// An output that accepts `n` writes (`start` included) and fails afterwards.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// All duty cycles written so far, `start` included.
    pub fn writes(&self) -> Vec<f64> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<f64> {
        self.writes.lock().ok().and_then(|w| w.last().copied())
    }

    fn push(&self, duty: f64) -> Result<(), BoxError> {
        let mut w = self
            .writes
            .lock()
            .map_err(|_| Box::new(std::io::Error::other("writes lock poisoned")) as BoxError)?;
        if self.fail_after.is_some_and(|n| w.len() >= n) {
            return Err(Box::new(std::io::Error::other("pwm write refused")));
        }
        w.push(duty);
        Ok(())
    }
}

impl PwmOutput for RecordingPwm {
    fn start(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        self.push(duty_percent)
    }

    fn set_duty_cycle(&mut self, duty_percent: f64) -> Result<(), BoxError> {
        self.push(duty_percent)
    }
}
