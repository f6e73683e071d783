//! Mean-reversion on book mid-price deviation, for a kernel that only matches market
//! orders rather than resting limit quotes.
//!
//! Tracks an "anchor" mid-price. Each tick it recomputes the current book mid from
//! best bid/ask; once the deviation from the anchor reaches `spread_bps`, it submits one
//! market order betting on reversion back toward the anchor (sell into a rally, buy into
//! a dip) and re-anchors to the new mid.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use sim_core::environment::{Environment, Strategy};
use sim_core::event::{CreateOrder, Event};
use sim_core::instrument::{Instrument, InstrumentType};
use sim_core::order::{Direction, Order, OrderAction, OrderType};

/// Reacts to book mid-price deviation from a rolling anchor with a single market order.
pub struct SimpleSpreadStrategy {
    exchange: String,
    instrument: Instrument,
    /// Minimum deviation from the anchor, in basis points, that triggers a trade.
    spread_bps: Decimal,
    order_size: Decimal,
    leverage: u32,
    anchor_mid: Option<Decimal>,
}

impl SimpleSpreadStrategy {
    pub fn new(
        exchange: impl Into<String>,
        instrument: Instrument,
        spread_bps: Decimal,
        order_size: Decimal,
        leverage: u32,
    ) -> Self {
        Self { exchange: exchange.into(), instrument, spread_bps, order_size, leverage, anchor_mid: None }
    }

    fn build_order(&self, direction: Direction, ts: i64) -> Option<Order> {
        let order = match self.instrument.inst_type {
            InstrumentType::Spot => {
                Order::new_spot(self.instrument.clone(), OrderType::Market, direction, self.order_size, ts)
            }
            InstrumentType::Futures | InstrumentType::Swap => Order::new_futures(
                self.instrument.clone(),
                OrderType::Market,
                direction,
                OrderAction::Open,
                self.leverage,
                self.order_size,
                ts,
            ),
        };
        order.ok()
    }
}

impl Strategy for SimpleSpreadStrategy {
    fn eval(&mut self, env: &mut Environment) -> Vec<Box<dyn Event>> {
        let ts = env.sim_time();
        let Some(exchange) = env.exchange_mut(&self.exchange) else {
            return Vec::new();
        };

        let book = match exchange.book(&self.instrument.inst_id, ts) {
            Ok(book) => book,
            Err(_) => return Vec::new(),
        };
        let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) else {
            return Vec::new();
        };
        let mid = (bid.price + ask.price) / Decimal::TWO;

        let anchor = *self.anchor_mid.get_or_insert(mid);
        if anchor.is_zero() {
            self.anchor_mid = Some(mid);
            return Vec::new();
        }
        let deviation_bps = (mid - anchor).abs() / anchor * dec!(10000);
        if deviation_bps < self.spread_bps {
            return Vec::new();
        }

        // Sell into a rally, buy into a dip: bet on reversion toward the anchor.
        let direction = if mid > anchor { Direction::SellShort } else { Direction::BuyLong };
        self.anchor_mid = Some(mid);

        match self.build_order(direction, ts) {
            Some(order) => {
                tracing::debug!(
                    inst_id = %self.instrument.inst_id, %anchor, %mid, %deviation_bps, ?direction,
                    "mid deviation crossed threshold, submitting reverting market order"
                );
                vec![Box::new(CreateOrder::new(ts, self.exchange.clone(), order)) as Box<dyn Event>]
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{book_rows_at, price_rows_at, test_environment};
    use rust_decimal_macros::dec;
    use sim_core::chunk_source::BookRow;

    fn spot_instrument() -> Instrument {
        Instrument::new_spot("BTC-USDT", "BTC", "USDT", dec!(0.01))
    }

    fn book_at(price_mid: Decimal, spread: Decimal) -> Vec<BookRow> {
        book_rows_at(price_mid - spread / Decimal::TWO, price_mid + spread / Decimal::TWO)
    }

    #[test]
    fn first_tick_only_anchors_and_trades_nothing() {
        let mut strategy = SimpleSpreadStrategy::new("OKX", spot_instrument(), dec!(50), dec!(0.01), 1);
        let mut env = test_environment(
            "OKX",
            book_at(dec!(100), dec!(0.02)),
            price_rows_at(dec!(100)),
            price_rows_at(dec!(100)),
            dec!(10_000),
        );
        let events = strategy.eval(&mut env);
        assert!(events.is_empty());
        assert_eq!(strategy.anchor_mid, Some(dec!(100.00)));
    }

    #[test]
    fn large_deviation_triggers_a_reverting_market_order() {
        let mut strategy = SimpleSpreadStrategy::new("OKX", spot_instrument(), dec!(50), dec!(0.01), 1);
        let mut env = test_environment(
            "OKX",
            book_at(dec!(100), dec!(0.02)),
            price_rows_at(dec!(100)),
            price_rows_at(dec!(100)),
            dec!(10_000),
        );
        strategy.eval(&mut env);

        // A fresh environment whose book mid has moved up ~1% (100 -> 101), far past
        // the 50bps threshold; the strategy should now bet on reversion by selling.
        let mut env2 = test_environment(
            "OKX",
            book_at(dec!(101), dec!(0.02)),
            price_rows_at(dec!(101)),
            price_rows_at(dec!(101)),
            dec!(10_000),
        );
        let events = strategy.eval(&mut env2);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn small_deviation_does_not_trade() {
        let mut strategy = SimpleSpreadStrategy::new("OKX", spot_instrument(), dec!(500), dec!(0.01), 1);
        let mut env = test_environment(
            "OKX",
            book_at(dec!(100), dec!(0.02)),
            price_rows_at(dec!(100)),
            price_rows_at(dec!(100)),
            dec!(10_000),
        );
        strategy.eval(&mut env);
        let mut env2 = test_environment(
            "OKX",
            book_at(dec!(100.1), dec!(0.02)),
            price_rows_at(dec!(100.1)),
            price_rows_at(dec!(100.1)),
            dec!(10_000),
        );
        let events = strategy.eval(&mut env2);
        assert!(events.is_empty());
    }
}
