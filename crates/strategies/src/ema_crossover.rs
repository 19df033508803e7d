use crate::error::StrategyError;
use crate::params::StrategyParams;
use crate::{MIN_ORDER_VALUE, Order, Strategy, TickContext};
use core_types::{ChartSink, OperationKind};
use ta::Next;
use ta::indicators::ExponentialMovingAverage as Ema;

#[derive(Debug, Clone)]
struct OpenTrade {
    code: i32,
    buy_price: f64,
    amount: f64,
    opened_at: usize,
}

/// Dual EMA crossover with a bounded number of concurrent trades.
///
/// A trade is opened when the fast EMA crosses above the slow one, sized as
/// `balance_multiplier * money / open_trades_count`. Every open trade is closed
/// independently on stop loss, take profit, expiry, or once the run enters its
/// sell-only phase.
pub struct EmaCrossover {
    params: StrategyParams,
    ema_fast: Ema,
    ema_slow: Ema,
    // Next candle index to feed to the indicators.
    fed: usize,
    previous: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
    open_trades: Vec<OpenTrade>,
    cooldown: u32,
    next_code: i32,
}

impl EmaCrossover {
    pub fn new(params: StrategyParams) -> Result<Self, StrategyError> {
        Ok(Self {
            ema_fast: Ema::new(params.ema_fast_period)?,
            ema_slow: Ema::new(params.ema_slow_period)?,
            params,
            fed: 0,
            previous: None,
            current: None,
            open_trades: Vec::new(),
            cooldown: 0,
            next_code: 1,
        })
    }

    pub fn open_trades(&self) -> usize {
        self.open_trades.len()
    }

    /// Feeds every candle up to `index` that the indicators have not seen yet.
    /// The first call therefore warms the EMAs over the whole history.
    fn feed(&mut self, ctx: &TickContext<'_>) {
        if ctx.index < self.fed {
            return;
        }
        for candle in &ctx.candles[self.fed..=ctx.index] {
            let value = (self.ema_fast.next(candle.close), self.ema_slow.next(candle.close));
            self.previous = self.current.replace(value);
        }
        self.fed = ctx.index + 1;
    }

    fn crossed_up(&self) -> bool {
        match (self.previous, self.current) {
            (Some((prev_fast, prev_slow)), Some((fast, slow))) => {
                prev_fast <= prev_slow && fast > slow
            }
            _ => false,
        }
    }

    fn close_reason(&self, trade: &OpenTrade, index: usize, price: f64, sell_only: bool) -> Option<&'static str> {
        let change = (price - trade.buy_price) * 100.0 / trade.buy_price;
        if sell_only {
            Some("cooldown")
        } else if change <= -self.params.top_loss {
            Some("stop loss")
        } else if change >= self.params.sell_barrier {
            Some("take profit")
        } else if index.saturating_sub(trade.opened_at) >= self.params.trade_expiry {
            Some("expired")
        } else {
            None
        }
    }
}

impl Strategy for EmaCrossover {
    fn on_tick(&mut self, ctx: &TickContext<'_>, chart: &mut dyn ChartSink) -> Result<Vec<Order>, StrategyError> {
        let candle = ctx.candles.get(ctx.index).ok_or(StrategyError::IndexOutOfRange {
            index: ctx.index,
            len: ctx.candles.len(),
        })?;
        self.feed(ctx);
        let Some((fast, slow)) = self.current else {
            return Ok(Vec::new());
        };

        chart.price_indicator("emaFast", candle.timestamp, fast);
        chart.price_indicator("emaSlow", candle.timestamp, slow);
        chart.extra_indicator("ema", "spread", candle.timestamp, fast - slow);

        let price = candle.close;
        let mut orders = Vec::new();

        // Close pass. Dust positions below the exchange minimum stay open.
        let mut coins = ctx.coins;
        let mut still_open = Vec::with_capacity(self.open_trades.len());
        for trade in std::mem::take(&mut self.open_trades) {
            let amount = trade.amount.min(coins);
            let reason = self.close_reason(&trade, ctx.index, price, ctx.sell_only);
            match reason {
                Some(reason) if amount * price >= MIN_ORDER_VALUE => {
                    coins -= amount;
                    let change = (price - trade.buy_price) * 100.0 / trade.buy_price;
                    orders.push(Order {
                        side: OperationKind::Sell,
                        amount,
                        description: format!(
                            "Close #{} ({reason}): {change:+.2}%\nBuy ${:.3}   Sell ${price:.3}\nHeld {} ticks",
                            trade.code,
                            trade.buy_price,
                            ctx.index.saturating_sub(trade.opened_at)
                        ),
                        code: trade.code,
                        entry_price: trade.buy_price,
                    });
                }
                _ => still_open.push(trade),
            }
        }
        self.open_trades = still_open;

        // Open pass.
        if ctx.sell_only || self.open_trades.len() >= self.params.open_trades_count {
            return Ok(orders);
        }
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return Ok(orders);
        }
        if self.crossed_up() {
            let budget = ctx.money * self.params.balance_multiplier / self.params.open_trades_count as f64;
            if budget >= MIN_ORDER_VALUE && price > 0.0 {
                let amount = budget / price;
                let code = self.next_code;
                self.next_code += 1;
                self.open_trades.push(OpenTrade {
                    code,
                    buy_price: price,
                    amount,
                    opened_at: ctx.index,
                });
                self.cooldown = self.params.buy_cooldown;
                tracing::debug!(code, price, amount, "EmaCrossover: opening trade");
                orders.push(Order {
                    side: OperationKind::Buy,
                    amount,
                    description: format!("Open #{code} at ${price:.3}"),
                    code,
                    entry_price: price,
                });
            }
        }
        Ok(orders)
    }
}
