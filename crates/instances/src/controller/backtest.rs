use super::ControllerContext;
use super::input::{
    COMMON_INPUT, COOLDOWN_TICKS_KEY, INITIAL_MONEY_KEY, PLOT_CHART_KEY, WARMUP_TICKS_KEY, parse,
    parse_period,
};
use crate::error::CommandError;
use crate::handle::InstanceHandle;
use crate::output::InstanceOutput;
use backtester::{BacktestParams, Backtester, trade_status};
use core_types::{ChartWriter, InputMap, OutputSink};
use market_data::{CsvTickSource, TICK_SOURCE_INPUT};
use std::sync::Arc;
use strategies::{STRATEGY_INPUT, create_strategy};

/// Runs a strategy over a historical tick archive.
#[derive(Clone)]
pub struct BacktestController {
    ctx: ControllerContext,
}

impl BacktestController {
    pub const ACTIONS: (&'static str, &'static str) = ("Run", "");

    pub fn new(ctx: ControllerContext) -> Self {
        Self { ctx }
    }

    pub(crate) fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn required_input() -> Vec<(&'static str, &'static str)> {
        let mut keys = COMMON_INPUT.to_vec();
        keys.push((PLOT_CHART_KEY, "3"));
        keys.extend(TICK_SOURCE_INPUT);
        keys.extend(STRATEGY_INPUT);
        keys
    }

    pub(crate) async fn run(&self, input: InputMap) -> Result<(), CommandError> {
        let handle = Arc::clone(&self.ctx.handle);
        tokio::task::spawn_blocking(move || simulate(&handle, &input)).await??;
        if !self.ctx.handle.persist(self.ctx.store.as_ref()).await? {
            tracing::debug!(instance = %self.ctx.handle.name(), "Instance evicted; skipping snapshot.");
        }
        Ok(())
    }
}

/// Loads the candles, drives the backtester and publishes its results.
fn simulate(handle: &Arc<InstanceHandle>, input: &InputMap) -> Result<(), CommandError> {
    let output = InstanceOutput::new(Arc::clone(handle));
    let period = parse_period(input)?;
    let initial_money: f64 = parse(input, INITIAL_MONEY_KEY)?;
    if !(initial_money.is_finite() && initial_money > 0.0) {
        return Err(CommandError::InvalidInput {
            key: INITIAL_MONEY_KEY.to_string(),
            value: initial_money.to_string(),
            reason: "must be a positive amount".to_string(),
        });
    }
    let params = BacktestParams {
        warmup_ticks: parse(input, WARMUP_TICKS_KEY)?,
        cooldown_ticks: parse(input, COOLDOWN_TICKS_KEY)?,
        initial_money,
    };
    let plot_chart: u8 = parse(input, PLOT_CHART_KEY)?;
    let strategy = create_strategy(input)?;

    let source = CsvTickSource::from_input(input)?;
    let candles = source.load(period)?;
    output.write(&format!(
        "Starting... (period: {} min, {} ticks)",
        period / 60,
        candles.len()
    ));

    let mut chart = ChartWriter::new(plot_chart);
    let mut backtester = Backtester::new(strategy, params);
    let report = backtester.run(&candles, &mut chart, &mut |trades| {
        let (text, positiveness) = trade_status(trades);
        handle.update_state(|state| state.set_status(text, positiveness));
    })?;

    for line in report.summary_lines() {
        output.write(&line);
    }

    let status = report.status_line();
    let positiveness = report.positiveness();
    let (price_indicators, extra_indicators) = chart.into_parts();
    let plotted = plot_chart >= 1;
    let trades = report.trades;
    let (candles, operations) = if plotted {
        (report.candles, report.operations)
    } else {
        Default::default()
    };
    handle.update_chart(|chart| {
        chart.candles = candles;
        chart.operations = operations;
        chart.price_indicators = price_indicators;
        chart.extra_indicators = extra_indicators;
    });
    handle.update_state(|state| {
        state.trades = trades;
        state.set_status(status, positiveness);
    });
    Ok(())
}
