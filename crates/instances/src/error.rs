use core_types::CoreError;
use market_data::MarketDataError;
use persistence::PersistenceError;
use thiserror::Error;

/// Failures of registry operations, surfaced synchronously to the caller.
#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("Instance '{0}' not found")]
    NotFound(String),

    #[error("Instance '{0}' already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    InvalidName(#[from] CoreError),

    #[error("Instance '{name}' has no action bound to button {button}")]
    InvalidButton { name: String, button: u32 },

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Instance '{name}' was unlisted but its documents could not be removed: {source}")]
    Orphaned {
        name: String,
        #[source]
        source: PersistenceError,
    },
}

impl InstanceError {
    /// Stable name of the error kind, for logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            InstanceError::NotFound(_) => "NotFound",
            InstanceError::AlreadyExists(_) => "AlreadyExists",
            InstanceError::InvalidName(CoreError::InvalidKind(_)) => "InvalidKind",
            InstanceError::InvalidName(_) => "InvalidName",
            InstanceError::InvalidButton { .. } => "InvalidButton",
            InstanceError::Persistence(_) => "Persistence",
            InstanceError::Orphaned { .. } => "Orphaned",
        }
    }
}

/// Failures inside a dispatched command. These never reach the request that
/// triggered the command; they end up in the instance output.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("input '{0}' is missing")]
    MissingInput(String),

    #[error("input '{key}' = '{value}' is invalid: {reason}")]
    InvalidInput {
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Strategy(#[from] strategies::StrategyError),

    #[error(transparent)]
    Backtest(#[from] backtester::BacktestError),

    #[error("could not save instance: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("button {0} has no command")]
    InvalidButton(u32),

    #[error("{0} is not supported by this server")]
    Unsupported(String),

    #[error("command worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("command panicked: {0}")]
    Panicked(String),
}
