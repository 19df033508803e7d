use super::ControllerContext;
use super::input::{COMMON_INPUT, parse_period};
use crate::error::CommandError;
use crate::handle::InstanceHandle;
use crate::output::InstanceOutput;
use core_types::{InputMap, OutputSink};
use market_data::{CsvTickSource, TICK_SOURCE_INPUT};
use std::sync::Arc;

/// Prepares a candle series for labelling and model training.
#[derive(Clone)]
pub struct TrainController {
    ctx: ControllerContext,
}

impl TrainController {
    pub const ACTIONS: (&'static str, &'static str) = ("Load series", "Build model");

    pub fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn required_input() -> Vec<(&'static str, &'static str)> {
        let mut keys = COMMON_INPUT.to_vec();
        keys.extend(TICK_SOURCE_INPUT);
        keys
    }

    pub(crate) async fn load_series(&self, input: InputMap) -> Result<(), CommandError> {
        let handle = Arc::clone(&self.ctx.handle);
        tokio::task::spawn_blocking(move || publish_series(&handle, &input)).await??;
        self.ctx.handle.persist(self.ctx.store.as_ref()).await?;
        Ok(())
    }

    pub(crate) async fn build_model(&self, _input: InputMap) -> Result<(), CommandError> {
        tracing::info!(instance = %self.ctx.handle.name(), "Model build requested.");
        Err(CommandError::Unsupported("model building".to_string()))
    }
}

fn publish_series(handle: &Arc<InstanceHandle>, input: &InputMap) -> Result<(), CommandError> {
    let output = InstanceOutput::new(Arc::clone(handle));
    let period = parse_period(input)?;
    let source = CsvTickSource::from_input(input)?;
    let candles = source.load(period)?;
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => output.write(&format!(
            "Loaded {} candles ({} - {})",
            candles.len(),
            first.timestamp,
            last.timestamp
        )),
        _ => output.write("No candles in the requested window."),
    }
    handle.update_chart(|chart| {
        chart.candles = candles;
        chart.operations.clear();
        chart.price_indicators.clear();
        chart.extra_indicators.clear();
    });
    Ok(())
}
