use crate::error::BacktestError;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Requested amounts exceeding the balance by no more than this are treated as
/// the whole balance, and order values short of the minimum by no more than
/// this still pass. Absorbs the `f64` round trip of the strategy.
const DUST: Decimal = dec!(0.000000001);

/// A simulated spot account filling every order at the current market price.
#[derive(Debug, Clone)]
pub struct PaperExchange {
    money: Decimal,
    coins: Decimal,
    market_price: Decimal,
    min_order_value: Decimal,
}

impl PaperExchange {
    pub fn new(initial_money: f64, initial_coins: f64, min_order_value: f64) -> Result<Self, BacktestError> {
        Ok(Self {
            money: to_decimal("initial money", initial_money)?,
            coins: to_decimal("initial coins", initial_coins)?,
            market_price: Decimal::ZERO,
            min_order_value: to_decimal("minimum order value", min_order_value)?,
        })
    }

    pub fn set_market_price(&mut self, price: f64) -> Result<(), BacktestError> {
        let price = to_decimal("market price", price)?;
        if price <= Decimal::ZERO {
            return Err(BacktestError::InvalidAmount {
                what: "market price",
                value: price.to_f64().unwrap_or_default(),
            });
        }
        self.market_price = price;
        Ok(())
    }

    /// Buys `coins` at market price. Returns the fill price.
    pub fn buy(&mut self, coins: f64) -> Result<Decimal, BacktestError> {
        let coins = to_amount(coins)?;
        let total = coins * self.market_price;
        if self.money < total {
            return Err(BacktestError::InsufficientFunds {
                coins: coins.to_string(),
                price: self.market_price.to_string(),
                required: total.to_string(),
                available: self.money.to_string(),
            });
        }
        self.check_minimum(total)?;
        self.money -= total;
        self.coins += coins;
        tracing::trace!(%coins, price = %self.market_price, "Paper buy filled");
        Ok(self.market_price)
    }

    /// Sells `coins` at market price. Returns the fill price.
    pub fn sell(&mut self, coins: f64) -> Result<Decimal, BacktestError> {
        let mut coins = to_amount(coins)?;
        if coins > self.coins {
            if coins - self.coins > DUST {
                return Err(BacktestError::InsufficientCoins {
                    requested: coins.to_string(),
                    available: self.coins.to_string(),
                });
            }
            coins = self.coins;
        }
        let total = coins * self.market_price;
        self.check_minimum(total)?;
        self.money += total;
        self.coins -= coins;
        tracing::trace!(%coins, price = %self.market_price, "Paper sell filled");
        Ok(self.market_price)
    }

    pub fn money(&self) -> Decimal {
        self.money
    }

    pub fn coins(&self) -> Decimal {
        self.coins
    }

    pub fn money_f64(&self) -> f64 {
        self.money.to_f64().unwrap_or_default()
    }

    pub fn coins_f64(&self) -> f64 {
        self.coins.to_f64().unwrap_or_default()
    }

    fn check_minimum(&self, total: Decimal) -> Result<(), BacktestError> {
        if self.min_order_value - total > DUST {
            return Err(BacktestError::OrderTooSmall {
                value: total.round_dp(8).to_string(),
                minimum: self.min_order_value.to_string(),
            });
        }
        Ok(())
    }
}

fn to_decimal(what: &'static str, value: f64) -> Result<Decimal, BacktestError> {
    Decimal::from_f64(value)
        .filter(|_| value.is_finite())
        .ok_or(BacktestError::InvalidAmount { what, value })
}

fn to_amount(coins: f64) -> Result<Decimal, BacktestError> {
    let amount = to_decimal("order amount", coins)?;
    if amount <= Decimal::ZERO {
        return Err(BacktestError::InvalidAmount {
            what: "order amount",
            value: coins,
        });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> PaperExchange {
        let mut exchange = PaperExchange::new(100.0, 0.0, 1.1).unwrap();
        exchange.set_market_price(10.0).unwrap();
        exchange
    }

    #[test]
    fn buy_then_sell_moves_balances() {
        let mut exchange = exchange();
        exchange.buy(2.0).unwrap();
        assert_eq!(exchange.money(), dec!(80));
        assert_eq!(exchange.coins(), dec!(2));

        exchange.set_market_price(12.0).unwrap();
        exchange.sell(2.0).unwrap();
        assert_eq!(exchange.money(), dec!(104));
        assert_eq!(exchange.coins(), Decimal::ZERO);
    }

    #[test]
    fn rejects_orders_below_minimum() {
        let mut exchange = exchange();
        assert!(matches!(exchange.buy(0.1), Err(BacktestError::OrderTooSmall { .. })));
        assert_eq!(exchange.money(), dec!(100));
    }

    #[test]
    fn order_sized_in_f64_at_the_minimum_is_accepted() {
        let mut exchange = exchange();
        exchange.set_market_price(3.0).unwrap();
        // 1.1 / 3.0 does not round trip exactly through f64.
        exchange.buy(1.1 / 3.0).unwrap();
        assert!(exchange.money() < dec!(100));

        exchange.set_market_price(3.0).unwrap();
        exchange.sell(1.1 / 3.0).unwrap();
        assert_eq!(exchange.coins(), Decimal::ZERO);
    }

    #[test]
    fn rejects_overdrafts() {
        let mut exchange = exchange();
        assert!(matches!(exchange.buy(11.0), Err(BacktestError::InsufficientFunds { .. })));
        assert!(matches!(exchange.sell(1.0), Err(BacktestError::InsufficientCoins { .. })));
    }

    #[test]
    fn dust_excess_sells_whole_balance() {
        let mut exchange = exchange();
        exchange.buy(2.0).unwrap();
        exchange.sell(2.000_000_000_000_1).unwrap();
        assert_eq!(exchange.coins(), Decimal::ZERO);
    }

    #[test]
    fn rejects_non_finite_amounts() {
        let mut exchange = exchange();
        assert!(matches!(exchange.buy(f64::NAN), Err(BacktestError::InvalidAmount { .. })));
        assert!(matches!(exchange.sell(-1.0), Err(BacktestError::InvalidAmount { .. })));
    }
}
