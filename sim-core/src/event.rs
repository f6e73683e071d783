//! Strategy-emitted events the `World` drains into the `Environment` each tick.
//!
//! `execute` attempts its effect exactly once; no retry/backoff semantics are modeled.
//! A `CreateOrder` against an exchange name absent from the `Environment` is a
//! configuration bug, so it propagates as `KernelError::UnknownExchange` rather than
//! being silently retried.

use std::fmt;

use uuid::Uuid;

use crate::environment::Environment;
use crate::error::Result;
use crate::order::Order;

/// A unit of work the `World` applies to the `Environment` at its scheduled `ts`.
pub trait Event: fmt::Debug {
    fn ts(&self) -> i64;

    /// Applies the event's effect. Returning `Ok(())` means the event is consumed and
    /// removed from the pending queue.
    fn execute(&mut self, env: &mut Environment) -> Result<()>;
}

/// `CreateOrder(ts, exchangeName, order)`: effect is
/// `exchanges[exchangeName].add_order(order)`.
#[derive(Debug)]
pub struct CreateOrder {
    ts: i64,
    exchange: String,
    order: Option<Order>,
}

impl CreateOrder {
    pub fn new(ts: i64, exchange: impl Into<String>, order: Order) -> Self {
        Self { ts, exchange: exchange.into(), order: Some(order) }
    }
}

impl Event for CreateOrder {
    fn ts(&self) -> i64 {
        self.ts
    }

    fn execute(&mut self, env: &mut Environment) -> Result<()> {
        let order = self.order.take().expect("CreateOrder::execute called more than once");
        match env.exchange_mut(&self.exchange) {
            Some(exchange) => exchange.add_order(order),
            None => Err(crate::error::KernelError::UnknownExchange { name: self.exchange.clone() }),
        }
    }
}

/// `CancelOrder(ts, uuid)`: effect marks the matching `OPEN` order `CANCELED`
/// on the named exchange.
#[derive(Debug)]
pub struct CancelOrder {
    ts: i64,
    exchange: String,
    order_id: Uuid,
}

impl CancelOrder {
    pub fn new(ts: i64, exchange: impl Into<String>, order_id: Uuid) -> Self {
        Self { ts, exchange: exchange.into(), order_id }
    }
}

impl Event for CancelOrder {
    fn ts(&self) -> i64 {
        self.ts
    }

    fn execute(&mut self, env: &mut Environment) -> Result<()> {
        match env.exchange_mut(&self.exchange) {
            Some(exchange) => exchange.cancel_order(self.order_id),
            None => Err(crate::error::KernelError::UnknownExchange { name: self.exchange.clone() }),
        }
    }
}
