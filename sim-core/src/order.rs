//! Stateful order entity: market/limit, side, fill detail, status machine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{KernelError, Result};
use crate::instrument::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// `BUYLONG` opens/extends a long exposure, `SELLSHORT` opens/extends a short one. For
/// spot orders this doubles as buy/sell (no leverage, no `OrderAction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    BuyLong,
    SellShort,
}

/// Futures-only: whether the order opens new contracts or closes existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
    Insufficient,
}

/// One partial or full execution against an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fill {
    pub ts: i64,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub instrument: Instrument,
    pub order_type: OrderType,
    pub direction: Direction,
    /// `Some` for futures/swap orders, `None` for spot.
    pub action: Option<OrderAction>,
    pub leverage: u32,
    pub amount: Decimal,
    pub create_ts: i64,
    status: OrderStatus,
    fills: Vec<Fill>,
}

impl Order {
    fn new(
        instrument: Instrument,
        order_type: OrderType,
        direction: Direction,
        action: Option<OrderAction>,
        leverage: u32,
        amount: Decimal,
        create_ts: i64,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(KernelError::InvalidTime { reason: format!("order amount must be > 0, got {amount}") });
        }
        if leverage == 0 {
            return Err(KernelError::InvalidTime { reason: "leverage must be >= 1".into() });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            instrument,
            order_type,
            direction,
            action,
            leverage,
            amount,
            create_ts,
            status: OrderStatus::Open,
            fills: Vec::new(),
        })
    }

    pub fn new_spot(
        instrument: Instrument,
        order_type: OrderType,
        direction: Direction,
        amount: Decimal,
        create_ts: i64,
    ) -> Result<Self> {
        Self::new(instrument, order_type, direction, None, 1, amount, create_ts)
    }

    pub fn new_futures(
        instrument: Instrument,
        order_type: OrderType,
        direction: Direction,
        action: OrderAction,
        leverage: u32,
        amount: Decimal,
        create_ts: i64,
    ) -> Result<Self> {
        Self::new(instrument, order_type, direction, Some(action), leverage, amount, create_ts)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Amount not yet filled.
    pub fn left_amount(&self) -> Decimal {
        self.amount - self.fills.iter().map(|f| f.amount).sum::<Decimal>()
    }

    /// Size-weighted average fill price. Only valid once `CLOSED`.
    pub fn atp(&self) -> Result<Decimal> {
        self.require_closed()?;
        let total_amount: Decimal = self.fills.iter().map(|f| f.amount).sum();
        let total_notional: Decimal = self.fills.iter().map(|f| f.price * f.amount).sum();
        Ok(total_notional / total_amount)
    }

    /// Sum of fees across all fills. Only valid once `CLOSED`.
    pub fn total_fee(&self) -> Result<Decimal> {
        self.require_closed()?;
        Ok(self.fills.iter().map(|f| f.fee).sum())
    }

    fn require_closed(&self) -> Result<()> {
        if self.status != OrderStatus::Closed {
            return Err(KernelError::OrderOperationOnTerminal { order_id: self.id });
        }
        Ok(())
    }

    /// Records a fill at `ts`. Requires `OPEN` status and `amount <= left_amount`;
    /// transitions to `CLOSED` once nothing is left.
    pub fn exe(&mut self, ts: i64, price: Decimal, amount: Decimal, fee: Decimal) -> Result<()> {
        if self.status != OrderStatus::Open {
            return Err(KernelError::OrderOperationOnTerminal { order_id: self.id });
        }
        if amount > self.left_amount() {
            return Err(KernelError::OrderOperationOnTerminal { order_id: self.id });
        }
        self.fills.push(Fill { ts, price, amount, fee });
        if self.left_amount().is_zero() {
            self.status = OrderStatus::Closed;
        }
        Ok(())
    }

    /// Transitions to the terminal `INSUFFICIENT` state.
    pub fn insufficient(&mut self) -> Result<()> {
        if self.status != OrderStatus::Open {
            return Err(KernelError::OrderOperationOnTerminal { order_id: self.id });
        }
        self.status = OrderStatus::Insufficient;
        Ok(())
    }

    /// Marks an `OPEN` order as externally canceled.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status != OrderStatus::Open {
            return Err(KernelError::OrderOperationOnTerminal { order_id: self.id });
        }
        self.status = OrderStatus::Canceled;
        Ok(())
    }
}
