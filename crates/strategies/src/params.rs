use crate::error::StrategyError;
use core_types::InputMap;
use std::str::FromStr;

pub const EMA_PERIODS_KEY: &str = "strategy.emaPeriods";
pub const OPEN_TRADES_COUNT_KEY: &str = "strategy.openTradesCount";
pub const BALANCE_MULTIPLIER_KEY: &str = "strategy.balanceMultiplier";
pub const BUY_COOLDOWN_KEY: &str = "strategy.buyCooldown";
pub const TOP_LOSS_KEY: &str = "strategy.close.topLoss";
pub const SELL_BARRIER_KEY: &str = "strategy.close.sellBarrier1";
pub const TRADE_EXPIRY_KEY: &str = "strategy.close.tradeExpiry";

/// Input keys (and their defaults) a strategy-driven instance declares.
pub const STRATEGY_INPUT: [(&str, &str); 7] = [
    (EMA_PERIODS_KEY, "12,26"),
    (OPEN_TRADES_COUNT_KEY, "5"),
    (BALANCE_MULTIPLIER_KEY, "0.4"),
    (BUY_COOLDOWN_KEY, "5"),
    (TOP_LOSS_KEY, "10"),
    (SELL_BARRIER_KEY, "10"),
    (TRADE_EXPIRY_KEY, "300"),
];

/// Parameters of the [`EmaCrossover`](crate::EmaCrossover) strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    /// Maximum number of trades open at once.
    pub open_trades_count: usize,
    /// Share of the free money split across the open trade slots.
    pub balance_multiplier: f64,
    /// Buy opportunities skipped after every buy.
    pub buy_cooldown: u32,
    /// Loss in percent that closes a trade.
    pub top_loss: f64,
    /// Gain in percent that closes a trade.
    pub sell_barrier: f64,
    /// Ticks after which a trade is closed whatever its result.
    pub trade_expiry: usize,
}

impl StrategyParams {
    pub fn from_input(input: &InputMap) -> Result<Self, StrategyError> {
        let periods = required(input, EMA_PERIODS_KEY)?;
        let (ema_fast_period, ema_slow_period) = parse_periods(periods)?;
        let params = Self {
            ema_fast_period,
            ema_slow_period,
            open_trades_count: parse(input, OPEN_TRADES_COUNT_KEY)?,
            balance_multiplier: parse(input, BALANCE_MULTIPLIER_KEY)?,
            buy_cooldown: parse(input, BUY_COOLDOWN_KEY)?,
            top_loss: parse(input, TOP_LOSS_KEY)?,
            sell_barrier: parse(input, SELL_BARRIER_KEY)?,
            trade_expiry: parse(input, TRADE_EXPIRY_KEY)?,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), StrategyError> {
        if self.ema_fast_period == 0 || self.ema_fast_period >= self.ema_slow_period {
            return Err(StrategyError::InvalidParameters(
                "Fast EMA period must be positive and less than the slow EMA period".to_string(),
            ));
        }
        if self.open_trades_count == 0 {
            return Err(StrategyError::InvalidParameters(
                "At least one open trade must be allowed".to_string(),
            ));
        }
        if !(self.balance_multiplier > 0.0 && self.balance_multiplier < 1.0) {
            return Err(StrategyError::InvalidParameters(format!(
                "Balance multiplier must be within (0, 1), got {}",
                self.balance_multiplier
            )));
        }
        if !(self.top_loss > 0.0 && self.sell_barrier > 0.0) {
            return Err(StrategyError::InvalidParameters(
                "Close thresholds must be positive percentages".to_string(),
            ));
        }
        if self.trade_expiry == 0 {
            return Err(StrategyError::InvalidParameters(
                "Trade expiry must be at least one tick".to_string(),
            ));
        }
        Ok(())
    }
}

fn required<'a>(input: &'a InputMap, key: &str) -> Result<&'a str, StrategyError> {
    input
        .get(key)
        .map(|value| value.trim())
        .ok_or_else(|| StrategyError::MissingInput(key.to_string()))
}

fn parse<T: FromStr>(input: &InputMap, key: &str) -> Result<T, StrategyError> {
    let value = required(input, key)?;
    value
        .parse()
        .map_err(|_| StrategyError::InvalidParameters(format!("{key} = '{value}' is not valid")))
}

fn parse_periods(value: &str) -> Result<(usize, usize), StrategyError> {
    let invalid = || {
        StrategyError::InvalidParameters(format!(
            "{EMA_PERIODS_KEY} = '{value}' must be two comma separated periods"
        ))
    };
    let (fast, slow) = value.split_once(',').ok_or_else(invalid)?;
    let fast = fast.trim().parse().map_err(|_| invalid())?;
    let slow = slow.trim().parse().map_err(|_| invalid())?;
    Ok((fast, slow))
}
