use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("'{0}' is flagged as decaying but has no decay description")]
    DecayUndocumented(String),

    #[error("'{0}' repaints; repainting indicators are not allowed")]
    RepaintingIndicator(String),

    #[error("'{name}': z-score {value} outside [-5, 5]")]
    ZScoreOutOfRange { name: String, value: f64 },

    #[error("'{name}': trend score must be -1, 0 or 1, got {value}")]
    InvalidTrendScore { name: String, value: i32 },

    #[error("Required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Data provider error: {0}")]
    Provider(String),
}
