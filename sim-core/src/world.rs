//! Outer event loop: advances the clock, drains strategy-emitted events into the
//! environment, evaluates every exchange, and snapshots history, in a fixed six-step
//! tick order, with an optional stop condition polled once per tick.

use crate::clock::Clock;
use crate::environment::{Environment, Strategy};
use crate::error::Result;
use crate::event::Event;
use crate::history::{HistLevel, History};

/// Predicate checked once per tick; the run stops early when it returns `true`.
pub type StopCondition = Box<dyn Fn(&Environment) -> bool>;

pub struct World {
    clock: Clock,
    environment: Environment,
    strategy: Box<dyn Strategy>,
    eval_step: i64,
    pending: Vec<Box<dyn Event>>,
    history: History,
    stop_condition: Option<StopCondition>,
}

impl World {
    pub fn new(
        clock: Clock,
        environment: Environment,
        strategy: Box<dyn Strategy>,
        eval_step: i64,
        hist_level: HistLevel,
        stop_condition: Option<StopCondition>,
    ) -> Self {
        Self {
            clock,
            environment,
            strategy,
            eval_step,
            pending: Vec::new(),
            history: History::new(hist_level),
            stop_condition,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Runs the backtest to completion: per tick, snapshot → stop check → strategy eval
    /// → event drain → exchange eval → clock advance. Consumes `self` and
    /// returns the finished `History` alongside the terminal clock/environment state.
    pub fn run(mut self) -> Result<History> {
        loop {
            self.environment.set_sim_time(self.clock.now());
            self.history.snapshot(&self.environment)?;

            let stopped_by_condition =
                self.stop_condition.as_ref().map(|cond| cond(&self.environment)).unwrap_or(false);
            if stopped_by_condition || self.clock.now() >= self.clock.end() {
                break;
            }

            let new_events = self.strategy.eval(&mut self.environment);
            self.pending.extend(new_events);
            self.drain_pending()?;

            self.environment.eval()?;

            if self.clock.now() >= self.clock.end() {
                break;
            }
            self.clock.add(self.eval_step)?;
        }
        Ok(self.history)
    }

    /// Executes every pending event in insertion order. Each event is attempted exactly
    /// once per tick and, on success, dropped from the queue.
    fn drain_pending(&mut self) -> Result<()> {
        let events = std::mem::take(&mut self.pending);
        for mut event in events {
            event.execute(&mut self.environment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_source::{BookRow, PriceRow, RowAction};
    use crate::book::BookSide;
    use crate::event::CreateOrder;
    use crate::instrument::Instrument;
    use crate::order::{Direction, Order, OrderType};
    use crate::testing::fixed_exchange;
    use rust_decimal_macros::dec;

    fn row(ts: i64, action: RowAction, side: BookSide, price: i64, size: i64) -> BookRow {
        BookRow { timestamp: ts, action, side, price: rust_decimal::Decimal::from(price), size: rust_decimal::Decimal::from(size), count: 1 }
    }

    struct OneShotBuyer {
        fired: bool,
    }

    impl Strategy for OneShotBuyer {
        fn eval(&mut self, env: &mut Environment) -> Vec<Box<dyn Event>> {
            if self.fired {
                return vec![];
            }
            self.fired = true;
            let inst = Instrument::new_spot("BTC-USDT", "BTC", "USDT", dec!(0.01));
            let order = Order::new_spot(inst, OrderType::Market, Direction::BuyLong, dec!(1), env.sim_time()).unwrap();
            vec![Box::new(CreateOrder::new(env.sim_time(), "OKX", order))]
        }
    }

    #[test]
    fn run_advances_clock_and_executes_strategy_orders() {
        let book = vec![
            row(0, RowAction::Snapshot, BookSide::Ask, 100, 10),
            row(0, RowAction::Snapshot, BookSide::Bid, 99, 10),
        ];
        let clock = Clock::new(0, 3000).unwrap();
        let exchange = fixed_exchange("OKX", book, vec![], vec![], dec!(1000));
        let environment = Environment::new(0, [("OKX".to_string(), exchange)]);
        let world = World::new(
            clock,
            environment,
            Box::new(OneShotBuyer { fired: false }),
            1000,
            HistLevel::Info,
            None,
        );

        let history = world.run().unwrap();
        assert!(history.len() >= 2);
        let last = history.get(history.len() - 1).unwrap();
        assert_eq!(last["exchanges"]["OKX"]["orders"][0]["status"], "Closed");
    }

    #[test]
    fn stop_condition_ends_the_run_early() {
        let clock = Clock::new(0, 100_000).unwrap();
        let exchange = fixed_exchange("OKX", vec![], vec![], vec![], dec!(100));
        let environment = Environment::new(0, [("OKX".to_string(), exchange)]);
        let world = World::new(
            clock,
            environment,
            Box::new(OneShotBuyer { fired: true }),
            1000,
            HistLevel::Info,
            Some(Box::new(|env: &Environment| env.sim_time() >= 2000)),
        );
        let history = world.run().unwrap();
        assert!(history.len() <= 3);
    }
}
