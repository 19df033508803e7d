use core_types::{
    Candle, ChartSink, OperationKind, Operation, Positiveness, TradeEntry, trades_profit,
};
use strategies::{MIN_ORDER_VALUE, Strategy, TickContext};

pub mod error;
pub mod exchange;

pub use error::BacktestError;
pub use exchange::PaperExchange;

/// Run parameters read from an instance's input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestParams {
    /// Candles fed to the strategy before the first simulated tick.
    pub warmup_ticks: usize,
    /// Final ticks during which the strategy may only sell.
    pub cooldown_ticks: usize,
    pub initial_money: f64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    /// The simulated candles, from the warm-up index to the end.
    pub candles: Vec<Candle>,
    pub operations: Vec<Operation>,
    pub trades: Vec<TradeEntry>,
    pub initial_money: f64,
    pub final_money: f64,
    pub final_coins: f64,
    pub first_price: f64,
    pub last_price: f64,
}

impl BacktestReport {
    /// Gain of the traded balance, in percent.
    pub fn trade_percent(&self) -> f64 {
        (self.final_money - self.initial_money) * 100.0 / self.initial_money
    }

    /// Gain of simply holding the coin over the run, in percent.
    pub fn hold_percent(&self) -> f64 {
        (self.last_price - self.first_price) * 100.0 / self.first_price
    }

    pub fn status_line(&self) -> String {
        format!(
            "{} ({:.1}% vs {:.1}%)",
            trade_status(&self.trades).0,
            self.trade_percent(),
            self.hold_percent()
        )
    }

    pub fn positiveness(&self) -> Positiveness {
        Positiveness::from_sign(self.trade_percent())
    }

    pub fn summary_lines(&self) -> Vec<String> {
        const RULE: &str = "  ______________________________________________________ ";
        vec![
            RULE.to_string(),
            "                   RESULTS                               ".to_string(),
            format!(" Initial balance        0.000'c ${:.3}", self.initial_money),
            format!(
                " Final balance          {:.3}'c ${:.3} (net {:.3}'c ${:.3})",
                self.final_coins,
                self.final_money,
                self.final_coins,
                self.final_money - self.initial_money
            ),
            format!(
                " Coin start/end value   ${:.3} / ${:.3} (net ${:.3})",
                self.first_price,
                self.last_price,
                self.last_price - self.first_price
            ),
            format!(" Trades: {}", self.trades.len()),
            RULE.to_string(),
        ]
    }
}

/// Running status of a set of closed trades: `"{n} trades sum ${sum}"`.
pub fn trade_status(trades: &[TradeEntry]) -> (String, Positiveness) {
    let sum = trades_profit(trades);
    (
        format!("{} trades sum ${sum:.2}", trades.len()),
        Positiveness::from_sign(sum),
    )
}

/// The tick-by-tick simulation loop.
pub struct Backtester {
    strategy: Box<dyn Strategy>,
    params: BacktestParams,
}

impl Backtester {
    pub fn new(strategy: Box<dyn Strategy>, params: BacktestParams) -> Self {
        Self { strategy, params }
    }

    /// Drives the strategy over `candles[warmup_ticks..]`, filling its orders on
    /// a paper exchange at each candle's close.
    ///
    /// `on_trade` is called with every closed trade so far each time a trade
    /// closes. Any exchange or strategy error aborts the run.
    pub fn run(
        &mut self,
        candles: &[Candle],
        chart: &mut dyn ChartSink,
        on_trade: &mut dyn FnMut(&[TradeEntry]),
    ) -> Result<BacktestReport, BacktestError> {
        let warmup = self.params.warmup_ticks;
        if candles.len() <= warmup {
            return Err(BacktestError::NotEnoughData {
                candles: candles.len(),
                required: warmup + 1,
            });
        }
        let last = candles.len() - 1;
        let sell_only_from = last.saturating_sub(self.params.cooldown_ticks);
        let mut exchange = PaperExchange::new(self.params.initial_money, 0.0, MIN_ORDER_VALUE)?;
        let mut report = BacktestReport {
            candles: Vec::with_capacity(candles.len() - warmup),
            initial_money: self.params.initial_money,
            first_price: candles[warmup].close,
            last_price: candles[last].close,
            ..BacktestReport::default()
        };

        tracing::info!(ticks = candles.len() - warmup, warmup, "Starting backtest run.");
        for (index, candle) in candles.iter().enumerate().skip(warmup) {
            exchange.set_market_price(candle.close)?;
            let ctx = TickContext {
                candles,
                index,
                money: exchange.money_f64(),
                coins: exchange.coins_f64(),
                sell_only: index >= sell_only_from,
            };
            let orders = self.strategy.on_tick(&ctx, chart)?;
            report.candles.push(*candle);

            for order in orders {
                match order.side {
                    OperationKind::Buy => exchange.buy(order.amount)?,
                    OperationKind::Sell => exchange.sell(order.amount)?,
                };
                if order.side == OperationKind::Sell {
                    report.trades.push(TradeEntry {
                        id: order.code,
                        buy: order.entry_price,
                        sell: candle.close,
                        amount: order.amount,
                    });
                    on_trade(&report.trades);
                }
                report.operations.push(Operation {
                    timestamp: candle.timestamp,
                    kind: order.side,
                    price: candle.close,
                    description: order.description,
                    code: order.code,
                });
            }
        }

        report.final_money = exchange.money_f64();
        report.final_coins = exchange.coins_f64();
        tracing::info!(
            trades = report.trades.len(),
            final_money = report.final_money,
            "Backtest run complete."
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ChartWriter;
    use strategies::{Order, StrategyError};

    /// Buys 5 coins on the first tick it sees, sells them when told to.
    struct BuyOnceSellLast {
        bought: bool,
    }

    impl Strategy for BuyOnceSellLast {
        fn on_tick(&mut self, ctx: &TickContext<'_>, chart: &mut dyn ChartSink) -> Result<Vec<Order>, StrategyError> {
            let candle = ctx.candles[ctx.index];
            chart.price_indicator("close", candle.timestamp, candle.close);
            if !self.bought {
                self.bought = true;
                return Ok(vec![Order {
                    side: OperationKind::Buy,
                    amount: 5.0,
                    description: "open".into(),
                    code: 7,
                    entry_price: candle.close,
                }]);
            }
            if ctx.sell_only && ctx.coins > 0.0 {
                return Ok(vec![Order {
                    side: OperationKind::Sell,
                    amount: ctx.coins,
                    description: "close".into(),
                    code: 7,
                    entry_price: 10.0,
                }]);
            }
            Ok(Vec::new())
        }
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: i as i64 * 300,
                open: close,
                close,
                high: close,
                low: close,
            })
            .collect()
    }

    fn params(warmup_ticks: usize, cooldown_ticks: usize) -> BacktestParams {
        BacktestParams {
            warmup_ticks,
            cooldown_ticks,
            initial_money: 100.0,
        }
    }

    #[test]
    fn runs_from_warmup_and_records_the_trade() {
        let series = candles(&[1.0, 2.0, 10.0, 11.0, 12.0, 14.0]);
        let mut backtester = Backtester::new(Box::new(BuyOnceSellLast { bought: false }), params(2, 1));
        let mut chart = ChartWriter::new(3);
        let mut updates = Vec::new();

        let report = backtester
            .run(&series, &mut chart, &mut |trades| updates.push(trades.len()))
            .unwrap();

        assert_eq!(report.candles.len(), 4);
        assert_eq!(report.candles[0].timestamp, 600);
        assert_eq!(report.operations.len(), 2);
        assert_eq!(report.operations[0].kind, OperationKind::Buy);
        assert_eq!(report.operations[1].timestamp, 1_200);
        assert_eq!(report.trades, vec![TradeEntry { id: 7, buy: 10.0, sell: 12.0, amount: 5.0 }]);
        assert_eq!(updates, vec![1]);
        assert!((report.final_money - 110.0).abs() < 1e-9);
        assert!((report.trade_percent() - 10.0).abs() < 1e-9);
        assert!((report.hold_percent() - 40.0).abs() < 1e-9);
        assert_eq!(report.status_line(), "1 trades sum $10.00 (10.0% vs 40.0%)");
        assert_eq!(report.positiveness(), Positiveness::Positive);
        assert_eq!(chart.into_parts().0["close"].len(), 4);
    }

    #[test]
    fn too_few_candles_is_not_enough_data() {
        let series = candles(&[1.0, 2.0, 3.0]);
        let mut backtester = Backtester::new(Box::new(BuyOnceSellLast { bought: false }), params(3, 0));
        let result = backtester.run(&series, &mut ChartWriter::new(0), &mut |_| {});
        assert!(matches!(
            result,
            Err(BacktestError::NotEnoughData { candles: 3, required: 4 })
        ));
    }

    #[test]
    fn exchange_rejection_aborts_the_run() {
        // 5 coins at 100 each is more than the initial money.
        let series = candles(&[100.0, 100.0]);
        let mut backtester = Backtester::new(Box::new(BuyOnceSellLast { bought: false }), params(0, 0));
        let result = backtester.run(&series, &mut ChartWriter::new(0), &mut |_| {});
        assert!(matches!(result, Err(BacktestError::InsufficientFunds { .. })));
    }

    #[test]
    fn summary_frames_the_results() {
        let report = BacktestReport {
            trades: vec![TradeEntry { id: 1, buy: 10.0, sell: 9.0, amount: 2.0 }],
            initial_money: 100.0,
            final_money: 98.0,
            first_price: 10.0,
            last_price: 9.0,
            ..BacktestReport::default()
        };
        let lines = report.summary_lines();
        assert_eq!(lines.first(), lines.last());
        assert!(lines.iter().any(|l| l == " Trades: 1"));
        assert_eq!(trade_status(&report.trades), ("1 trades sum $-2.00".to_string(), Positiveness::Negative));
    }
}
