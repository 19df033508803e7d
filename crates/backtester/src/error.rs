use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Strategy execution error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Not enough data: {candles} candles loaded, at least {required} needed")]
    NotEnoughData { candles: usize, required: usize },

    #[error("Not enough balance to buy {coins} coins at ${price} each (total ${required}, available ${available})")]
    InsufficientFunds {
        coins: String,
        price: String,
        required: String,
        available: String,
    },

    #[error("Want to sell {requested} coins but got only {available} coins")]
    InsufficientCoins { requested: String, available: String },

    #[error("Only orders of at least ${minimum} are allowed (tried ${value})")]
    OrderTooSmall { value: String, minimum: String },

    #[error("Invalid {what}: {value}")]
    InvalidAmount { what: &'static str, value: f64 },
}
