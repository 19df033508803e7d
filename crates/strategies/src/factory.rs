use crate::Strategy;
use crate::ema_crossover::EmaCrossover;
use crate::error::StrategyError;
use crate::params::StrategyParams;
use core_types::InputMap;

/// Creates the strategy configured by an instance's input map.
pub fn create_strategy(input: &InputMap) -> Result<Box<dyn Strategy>, StrategyError> {
    let params = StrategyParams::from_input(input)?;
    tracing::debug!(?params, "Creating EmaCrossover strategy");
    Ok(Box::new(EmaCrossover::new(params)?))
}
