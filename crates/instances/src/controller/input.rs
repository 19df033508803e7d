use crate::error::CommandError;
use core_types::InputMap;
use std::fmt::Display;
use std::str::FromStr;

pub const PAIR_KEY: &str = "pair";
pub const PERIOD_KEY: &str = "period";
pub const WARMUP_TICKS_KEY: &str = "warmupTicks";
pub const COOLDOWN_TICKS_KEY: &str = "cooldownTicks";
pub const INITIAL_MONEY_KEY: &str = "initialMoney";
pub const PLOT_CHART_KEY: &str = "plotChart";

/// Input keys every kind declares.
pub const COMMON_INPUT: [(&str, &str); 5] = [
    (PAIR_KEY, "USDT_ETH"),
    (PERIOD_KEY, "300"),
    (WARMUP_TICKS_KEY, "300"),
    (COOLDOWN_TICKS_KEY, "300"),
    (INITIAL_MONEY_KEY, "100"),
];

pub fn required<'a>(input: &'a InputMap, key: &str) -> Result<&'a str, CommandError> {
    input
        .get(key)
        .map(|value| value.trim())
        .ok_or_else(|| CommandError::MissingInput(key.to_string()))
}

pub fn parse<T>(input: &InputMap, key: &str) -> Result<T, CommandError>
where
    T: FromStr,
    T::Err: Display,
{
    let value = required(input, key)?;
    value.parse().map_err(|e: T::Err| CommandError::InvalidInput {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Sampling period in seconds; must be positive.
pub fn parse_period(input: &InputMap) -> Result<i64, CommandError> {
    let period: i64 = parse(input, PERIOD_KEY)?;
    if period < 1 {
        return Err(CommandError::InvalidInput {
            key: PERIOD_KEY.to_string(),
            value: period.to_string(),
            reason: "must be at least one second".to_string(),
        });
    }
    Ok(period)
}
