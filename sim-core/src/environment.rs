//! The `Strategy` trait and the `Environment` it reads from.
//!
//! A thin keyed container over `Exchange`s plus the current sim time, with typed
//! accessors (`exchange`/`exchange_mut`) rather than a string-keyed dispatcher.

use std::collections::HashMap;

use crate::error::Result;
use crate::event::Event;
use crate::exchange::Exchange;

/// Read/mutate surface a `Strategy` sees each tick. `Environment` owns every `Exchange`
/// for the backtest; strategies reach market data and balances through `Exchange`'s own
/// read accessors.
pub struct Environment {
    sim_time: i64,
    exchanges: HashMap<String, Exchange>,
}

impl Environment {
    pub fn new(sim_time: i64, exchanges: impl IntoIterator<Item = (String, Exchange)>) -> Self {
        Self { sim_time, exchanges: exchanges.into_iter().collect() }
    }

    pub fn sim_time(&self) -> i64 {
        self.sim_time
    }

    pub(crate) fn set_sim_time(&mut self, ts: i64) {
        self.sim_time = ts;
    }

    pub fn exchange(&self, name: &str) -> Option<&Exchange> {
        self.exchanges.get(name)
    }

    pub fn exchange_mut(&mut self, name: &str) -> Option<&mut Exchange> {
        self.exchanges.get_mut(name)
    }

    pub fn exchanges(&self) -> impl Iterator<Item = (&String, &Exchange)> {
        self.exchanges.iter()
    }

    /// Delegates to each exchange's `eval()`.
    pub fn eval(&mut self) -> Result<()> {
        for exchange in self.exchanges.values_mut() {
            exchange.eval(self.sim_time)?;
        }
        Ok(())
    }
}

/// Supplies orders for the `World` to drain into the `Environment` each tick via
/// `eval(environment) -> list[Event]`.
pub trait Strategy {
    fn eval(&mut self, env: &mut Environment) -> Vec<Box<dyn Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixed_exchange;
    use rust_decimal_macros::dec;

    #[test]
    fn exchange_lookup_by_name() {
        let env = Environment::new(0, [("OKX".to_string(), fixed_exchange("OKX", vec![], vec![], vec![], dec!(100)))]);
        assert!(env.exchange("OKX").is_some());
        assert!(env.exchange("BINANCE").is_none());
    }

    #[test]
    fn eval_delegates_to_every_exchange() {
        let mut env = Environment::new(
            1000,
            [
                ("A".to_string(), fixed_exchange("A", vec![], vec![], vec![], dec!(100))),
                ("B".to_string(), fixed_exchange("B", vec![], vec![], vec![], dec!(100))),
            ],
        );
        // no positions/orders on either exchange, so eval() is a no-op that must still
        // succeed across both exchanges.
        env.eval().unwrap();
    }
}
