use super::ControllerContext;
use super::input::{COMMON_INPUT, PAIR_KEY, required};
use crate::error::CommandError;
use core_types::InputMap;
use market_data::TICK_SOURCE_INPUT;
use strategies::STRATEGY_INPUT;

/// Trades a strategy against a live exchange. Exchange connectivity lives
/// outside this server, so only the input contract is served here.
#[derive(Clone)]
pub struct LiveController {
    ctx: ControllerContext,
}

impl LiveController {
    pub const ACTIONS: (&'static str, &'static str) = ("Start", "");

    pub fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn required_input() -> Vec<(&'static str, &'static str)> {
        let mut keys = COMMON_INPUT.to_vec();
        keys.extend(TICK_SOURCE_INPUT);
        keys.extend(STRATEGY_INPUT);
        keys
    }

    pub(crate) async fn start(&self, input: InputMap) -> Result<(), CommandError> {
        let pair = required(&input, PAIR_KEY)?;
        tracing::info!(instance = %self.ctx.handle.name(), pair, "Live start requested.");
        Err(CommandError::Unsupported(format!("live trading on {pair}")))
    }
}
