use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum MotorError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("encoder input unavailable: {0}")]
    Encoder(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing encoder input")]
    MissingEncoder,
    #[error("missing pwm output")]
    MissingPwm,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
