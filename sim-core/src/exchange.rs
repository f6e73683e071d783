//! Per-venue matching and accounting kernel: owns a reader bundle, balances, orders,
//! positions, and the fixed fee schedule. `eval()` is the single per-tick entry point:
//! liquidation sweep, then delivery sweep, then order matching, in that fixed order.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::balance::Balance;
use crate::error::{KernelError, Result};
use crate::instrument::{Instrument, InstrumentType};
use crate::market_data::{DataSourceFactory, MarketData};
use crate::order::{Direction, Order, OrderAction, OrderStatus, OrderType};
use crate::position_book::PositionBook;

/// Taker/maker fee rates for one market kind. Market orders always incur the taker rate
///; `maker` is retained for
/// the limit-order extension seam.
#[derive(Debug, Clone, Copy)]
pub struct FeeRate {
    pub taker: Decimal,
    pub maker: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    pub spot: FeeRate,
    pub futures: FeeRate,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            spot: FeeRate { taker: Decimal::new(10, 4), maker: Decimal::new(8, 4) },
            futures: FeeRate { taker: Decimal::new(5, 4), maker: Decimal::new(2, 4) },
        }
    }
}

const DEFAULT_MMR: Decimal = Decimal::from_parts(4, 0, 0, false, 3); // 0.004
const DEFAULT_DELIVERY_FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 4); // 0.0001

fn is_futures_quote_supported(ccy: &str) -> bool {
    ccy.eq_ignore_ascii_case("USDT") || ccy.eq_ignore_ascii_case("USDC")
}

/// Contracts are indivisible,
/// so an executed amount must be a non-negative whole number before it can become a
/// contract count for `Position::open`/`close`.
fn contract_count(exec: Decimal) -> Result<u64> {
    if exec.fract() != Decimal::ZERO || exec < Decimal::ZERO {
        return Err(KernelError::MalformedRow {
            detail: format!("futures execution amount {exec} is not a whole number of contracts"),
        });
    }
    exec.to_u64().ok_or_else(|| KernelError::MalformedRow {
        detail: format!("futures execution amount {exec} out of range"),
    })
}

/// One venue's complete state: reader bundle, ledger, order list, positions, fees.
pub struct Exchange {
    name: String,
    market_data: MarketData,
    balance: Balance,
    orders: Vec<Order>,
    positions: PositionBook,
    fees: FeeSchedule,
    mmr: Decimal,
    delivery_fee_rate: Decimal,
}

impl Exchange {
    pub fn new(
        name: impl Into<String>,
        factory: Box<dyn DataSourceFactory>,
        max_interval: i64,
        mid_window: usize,
        initial_balance: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            market_data: MarketData::new(factory, max_interval, mid_window),
            balance: Balance::new(initial_balance)?,
            orders: Vec::new(),
            positions: PositionBook::new(),
            fees: FeeSchedule::default(),
            mmr: DEFAULT_MMR,
            delivery_fee_rate: DEFAULT_DELIVERY_FEE_RATE,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn positions(&self) -> impl Iterator<Item = &crate::position::Position> {
        self.positions.iter()
    }

    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    /// Read-only deep copy of the current book for `inst_id` as of `clock`.
    pub fn book(&mut self, inst_id: &str, clock: i64) -> Result<crate::book::OrderBook> {
        self.market_data.book(inst_id, clock).map(|b| b.clone())
    }

    pub fn mark_price(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        self.market_data.mark_price(inst_id, clock)
    }

    pub fn index_price(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        self.market_data.index_price(inst_id, clock)
    }

    /// Mark price with the mid-price tracker as fallback.
    fn mark_or_mid(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        match self.market_data.mark_price(inst_id, clock) {
            Ok(v) => Ok(v),
            Err(_) => self.market_data.mid_price(inst_id, clock),
        }
    }

    /// Index price with mark/mid as fallback when index data are unavailable.
    fn index_or_fallback(&mut self, inst_id: &str, clock: i64) -> Result<Decimal> {
        match self.market_data.index_price(inst_id, clock) {
            Ok(v) => Ok(v),
            Err(_) => self.mark_or_mid(inst_id, clock),
        }
    }

    /// Appends an order to the pending queue.
    pub fn add_order(&mut self, order: Order) -> Result<()> {
        self.orders.push(order);
        Ok(())
    }

    /// Marks the matching `OPEN` order `CANCELED`.
    pub fn cancel_order(&mut self, order_id: Uuid) -> Result<()> {
        let order = self.orders.iter_mut().find(|o| o.id == order_id);
        match order {
            Some(o) if o.status() == OrderStatus::Open => o.cancel(),
            Some(o) => Err(KernelError::OrderOperationOnTerminal { order_id: o.id }),
            None => Err(KernelError::OrderOperationOnTerminal { order_id }),
        }
    }

    /// The fixed per-tick step: liquidation sweep, delivery sweep, order matching
    ///. Order of operations must not be reordered.
    pub fn eval(&mut self, clock: i64) -> Result<()> {
        self.liquidation_sweep(clock)?;
        self.delivery_sweep(clock)?;
        self.match_orders(clock)?;
        Ok(())
    }

    /// Synthesises and immediately executes a market close for any position whose
    /// margin rate has fallen to or below 1.0.
    fn liquidation_sweep(&mut self, clock: i64) -> Result<()> {
        let candidates: Vec<(Instrument, Direction, u32, u64)> = {
            let mut out = Vec::new();
            for pos in self.positions.iter() {
                if pos.open_num() == 0 {
                    continue;
                }
                out.push((pos.instrument().clone(), pos.direction(), pos.leverage(), pos.open_num() as u64));
            }
            out
        };

        for (instrument, direction, leverage, open_num) in candidates {
            let mark = self.mark_or_mid(&instrument.inst_id, clock)?;
            let breached = {
                let pos = self
                    .positions
                    .iter()
                    .find(|p| p.matches_key(&instrument, direction, leverage))
                    .expect("candidate collected from self.positions above");
                pos.margin_rate(mark, self.mmr, self.fees.futures.taker) <= Decimal::ONE
            };
            if !breached {
                continue;
            }
            tracing::info!(inst = %instrument.inst_id, direction = %direction_label(direction), "forced liquidation triggered");
            let mut order = Order::new_futures(
                instrument.clone(),
                OrderType::Market,
                direction,
                OrderAction::Close,
                leverage,
                Decimal::from(open_num),
                clock,
            )?;
            self.execute_futures_order(&mut order, clock)?;
            self.orders.push(order);
        }
        Ok(())
    }

    /// Settles every position whose instrument has reached expiry, and purges any
    /// still-open orders referencing it.
    fn delivery_sweep(&mut self, clock: i64) -> Result<()> {
        let candidates: Vec<(Instrument, Direction, u32, u64)> = {
            let mut out = Vec::new();
            for pos in self.positions.iter() {
                if pos.open_num() == 0 || !pos.instrument().is_delivered_at(clock) {
                    continue;
                }
                out.push((pos.instrument().clone(), pos.direction(), pos.leverage(), pos.open_num() as u64));
            }
            out
        };

        for (instrument, direction, leverage, open_num) in candidates {
            let close_price = self.index_or_fallback(&instrument.inst_id, clock)?;
            let fee = close_price * Decimal::from(open_num) * instrument.contract_size * self.delivery_fee_rate;
            let returned = self.positions.close(&instrument, direction, leverage, close_price, open_num)?;
            self.balance.add(&instrument.quote_ccy, returned)?;
            self.balance.sub(&instrument.quote_ccy, fee)?;
            tracing::info!(inst = %instrument.inst_id, close_price = %close_price, fee = %fee, "delivery settled");

            for order in self.orders.iter_mut() {
                if order.instrument == instrument && order.status() == OrderStatus::Open {
                    let _ = order.cancel();
                }
            }
        }
        Ok(())
    }

    /// Walks every `OPEN` order in insertion order and dispatches by instrument kind.
    fn match_orders(&mut self, clock: i64) -> Result<()> {
        for idx in 0..self.orders.len() {
            if self.orders[idx].status() != OrderStatus::Open {
                continue;
            }
            if self.orders[idx].order_type == OrderType::Limit {
                return Err(KernelError::NotImplemented { detail: "limit order matching".into() });
            }
            let instrument = self.orders[idx].instrument.clone();
            match instrument.inst_type {
                InstrumentType::Spot => self.execute_spot_order_at(idx, clock)?,
                InstrumentType::Futures => self.execute_futures_order_at(idx, clock)?,
                InstrumentType::Swap => {
                    return Err(KernelError::UnsupportedInstType { inst_id: instrument.inst_id });
                }
            }
        }
        Ok(())
    }

    fn execute_spot_order_at(&mut self, idx: usize, clock: i64) -> Result<()> {
        let inst_id = self.orders[idx].instrument.inst_id.clone();
        let book = self.market_data.book(&inst_id, clock)?.clone();
        let direction = self.orders[idx].direction;
        let quote_ccy = self.orders[idx].instrument.quote_ccy.clone();
        let base_ccy = self.orders[idx].instrument.base_ccy.clone();
        let fee_rate = self.fees.spot.taker;

        let levels: Vec<crate::book::BookLevel> = match direction {
            Direction::BuyLong => book.asks().to_vec(),
            Direction::SellShort => book.bids().to_vec(),
        };

        for level in levels {
            let order = &self.orders[idx];
            if order.status() != OrderStatus::Open {
                break;
            }
            let left = order.left_amount();
            if left.is_zero() {
                break;
            }
            let exec = left.min(level.size);
            if exec.is_zero() {
                continue;
            }

            match direction {
                Direction::BuyLong => {
                    let cost = level.price * exec;
                    if cost > self.balance.get(&quote_ccy) {
                        self.orders[idx].insufficient()?;
                        break;
                    }
                    let fee = exec * fee_rate;
                    self.balance.sub(&quote_ccy, cost)?;
                    self.balance.add(&base_ccy, exec - fee)?;
                    self.orders[idx].exe(clock, level.price, exec, fee)?;
                }
                Direction::SellShort => {
                    if exec > self.balance.get(&base_ccy) {
                        self.orders[idx].insufficient()?;
                        break;
                    }
                    let proceeds = exec * level.price;
                    let fee = proceeds * fee_rate;
                    self.balance.sub(&base_ccy, exec)?;
                    self.balance.add(&quote_ccy, proceeds - fee)?;
                    self.orders[idx].exe(clock, level.price, exec, fee)?;
                }
            }
            tracing::debug!(inst = %inst_id, price = %level.price, amount = %exec, "spot fill");
        }

        let order = &mut self.orders[idx];
        if order.status() == OrderStatus::Open && !order.left_amount().is_zero() {
            order.insufficient()?;
        }
        Ok(())
    }

    fn execute_futures_order_at(&mut self, idx: usize, clock: i64) -> Result<()> {
        let mut order = self.orders.remove(idx);
        let result = self.execute_futures_order(&mut order, clock);
        self.orders.insert(idx, order);
        result
    }

    /// Shared by normal order matching and the liquidation sweep's synthetic close.
    fn execute_futures_order(&mut self, order: &mut Order, clock: i64) -> Result<()> {
        let instrument = order.instrument.clone();
        let quote_ccy = instrument.quote_ccy.clone();
        if !is_futures_quote_supported(&quote_ccy) {
            return Err(KernelError::UnsupportedQuote { quote_ccy });
        }
        let action = order.action.unwrap_or(OrderAction::Open);
        let direction = order.direction;
        let leverage = order.leverage;
        let fee_rate = self.fees.futures.taker;
        let contract_size = instrument.contract_size;

        let book = self.market_data.book(&instrument.inst_id, clock)?.clone();
        let walk_asks = matches!(
            (action, direction),
            (OrderAction::Open, Direction::BuyLong) | (OrderAction::Close, Direction::SellShort)
        );
        let levels: Vec<crate::book::BookLevel> =
            if walk_asks { book.asks().to_vec() } else { book.bids().to_vec() };

        for level in levels {
            if order.status() != OrderStatus::Open {
                break;
            }
            let left = order.left_amount();
            if left.is_zero() {
                break;
            }
            let exec = left.min(level.size);
            if exec.is_zero() {
                continue;
            }

            match action {
                OrderAction::Open => {
                    let notional = level.price * exec * contract_size;
                    let margin = notional / Decimal::from(leverage);
                    let fee = notional * fee_rate;
                    let cost = margin + fee;
                    if cost > self.balance.get(&quote_ccy) {
                        order.insufficient()?;
                        break;
                    }
                    self.positions.open(&instrument, direction, leverage, level.price, contract_count(exec)?)?;
                    self.balance.sub(&quote_ccy, cost)?;
                    order.exe(clock, level.price, exec, fee)?;
                }
                OrderAction::Close => {
                    let fee = level.price * exec * contract_size * fee_rate;
                    if self.balance.get(&quote_ccy) < fee {
                        order.insufficient()?;
                        break;
                    }
                    let returned = self.positions.close(&instrument, direction, leverage, level.price, contract_count(exec)?)?;
                    self.balance.add(&quote_ccy, returned - fee)?;
                    order.exe(clock, level.price, exec, fee)?;
                }
            }
            tracing::debug!(inst = %instrument.inst_id, action = ?action, price = %level.price, amount = %exec, "futures fill");
        }

        if order.status() == OrderStatus::Open && !order.left_amount().is_zero() {
            order.insufficient()?;
        }
        Ok(())
    }
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::BuyLong => "buy_long",
        Direction::SellShort => "sell_short",
    }
}
