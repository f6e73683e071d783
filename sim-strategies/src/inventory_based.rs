//! Inventory targeting, the market-order-only counterpart of an Avellaneda-Stoikov-style
//! maker: instead of skewing resting quotes around a reservation price, it rebalances the
//! base-currency balance toward a target with a sized market order whenever the imbalance
//! exceeds a threshold, scaled down by a configurable risk-aversion factor.

use rust_decimal::Decimal;

use sim_core::environment::{Environment, Strategy};
use sim_core::event::{CreateOrder, Event};
use sim_core::instrument::Instrument;
use sim_core::order::{Direction, Order, OrderType};

/// Rebalances `balance(instrument.base_ccy)` toward `target_inventory`.
pub struct InventoryBasedStrategy {
    exchange: String,
    instrument: Instrument,
    target_inventory: Decimal,
    /// Minimum absolute imbalance, in base currency units, before a rebalancing order
    /// is sent. Avoids submitting dust-sized orders every tick.
    rebalance_threshold: Decimal,
    /// In `(0, 1]`: the fraction of the imbalance corrected per rebalance. Lower values
    /// trade more conservatively, spreading the correction across more ticks.
    risk_aversion: Decimal,
    max_order_size: Decimal,
}

impl InventoryBasedStrategy {
    pub fn new(
        exchange: impl Into<String>,
        instrument: Instrument,
        target_inventory: Decimal,
        rebalance_threshold: Decimal,
        risk_aversion: Decimal,
        max_order_size: Decimal,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            instrument,
            target_inventory,
            rebalance_threshold,
            risk_aversion,
            max_order_size,
        }
    }
}

impl Strategy for InventoryBasedStrategy {
    fn eval(&mut self, env: &mut Environment) -> Vec<Box<dyn Event>> {
        let ts = env.sim_time();
        let Some(exchange) = env.exchange_mut(&self.exchange) else {
            return Vec::new();
        };

        let inventory = exchange.balance().get(&self.instrument.base_ccy);
        let imbalance = inventory - self.target_inventory;
        if imbalance.abs() < self.rebalance_threshold {
            return Vec::new();
        }

        let size = (imbalance.abs() * self.risk_aversion).min(self.max_order_size);
        if size.is_zero() {
            return Vec::new();
        }

        // Holding more than target: sell the excess. Holding less: buy to close the gap.
        let direction = if imbalance > Decimal::ZERO { Direction::SellShort } else { Direction::BuyLong };
        let order = match Order::new_spot(self.instrument.clone(), OrderType::Market, direction, size, ts) {
            Ok(order) => order,
            Err(_) => return Vec::new(),
        };
        tracing::debug!(
            inst_id = %self.instrument.inst_id, %inventory, target = %self.target_inventory, %size, ?direction,
            "inventory imbalance exceeded threshold, submitting rebalancing market order"
        );
        vec![Box::new(CreateOrder::new(ts, self.exchange.clone(), order)) as Box<dyn Event>]
    }
}
