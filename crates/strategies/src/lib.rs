//! # Strategy Library
//!
//! Trading logic plugged into the backtester. A strategy consumes a candle
//! sequence one tick at a time, may draw indicator series through a
//! [`ChartSink`], and answers with the orders it wants executed at the tick's
//! close price.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no I/O and no knowledge of instances or persistence. The
//!   strategy is given its parameters, it does not load them.
//! - **Strategy agnostic runner:** the backtester drives any `Strategy` without
//!   knowing its internals.

pub mod ema_crossover;
pub mod error;
pub mod factory;
pub mod params;

pub use ema_crossover::EmaCrossover;
pub use error::StrategyError;
pub use factory::create_strategy;
pub use params::{STRATEGY_INPUT, StrategyParams};

use core_types::{Candle, ChartSink, OperationKind};

/// Smallest order value, in quote currency, the exchange accepts.
pub const MIN_ORDER_VALUE: f64 = 1.1;

/// What a strategy sees at one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// The whole loaded series. Only `candles[..=index]` may be looked at.
    pub candles: &'a [Candle],
    pub index: usize,
    /// Free quote balance.
    pub money: f64,
    /// Coin balance.
    pub coins: f64,
    /// Set during the closing phase of a run: no new trade may be opened.
    pub sell_only: bool,
}

/// An order requested by a strategy, filled at the current close price.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub side: OperationKind,
    /// Amount of coins.
    pub amount: f64,
    pub description: String,
    /// Identifies the trade across its buy and its sell.
    pub code: i32,
    /// Price the trade was opened at.
    pub entry_price: f64,
}

/// The core trait all trading strategies implement.
///
/// `&mut self` lets strategies keep their own state (indicator values, open
/// trades) between ticks. `Send` allows a run to move onto a worker thread.
pub trait Strategy: Send {
    /// Evaluates the tick at `ctx.index`, returning the orders to execute.
    fn on_tick(&mut self, ctx: &TickContext<'_>, chart: &mut dyn ChartSink) -> Result<Vec<Order>, StrategyError>;
}
