use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Strategy received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Strategy input '{0}' is missing")]
    MissingInput(String),

    #[error("An error occurred during indicator calculation: {0}")]
    IndicatorError(String),

    #[error("Tick index {index} is outside of the {len} loaded candles")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<ta::errors::TaError> for StrategyError {
    fn from(error: ta::errors::TaError) -> Self {
        StrategyError::IndicatorError(error.to_string())
    }
}
