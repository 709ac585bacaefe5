use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrivacyError {
    #[error("Epsilon must be positive and finite, got {0}")]
    InvalidEpsilon(f64),

    #[error("Sensitivity must be positive and finite, got {0}")]
    InvalidSensitivity(f64),

    #[error("Budget decay rate must lie strictly between 0 and 1, got {0}")]
    InvalidDecay(f64),

    #[error("{parameter} must be at least 1")]
    InvalidThreshold { parameter: &'static str },
}
