//! Aggregate of same-direction futures contracts for one `(instrument, direction,
//! leverage)` key: margin, loan, AOP/ACP, unrealised P&L, margin rate.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::contract::{Contract, ContractRole, ContractStatus};
use crate::error::{KernelError, Result};
use crate::instrument::Instrument;
use crate::order::{Direction, Order, OrderAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionStatus {
    Init,
    Open,
    Close,
}

/// Aggregate of contracts for one `(instrument, direction, leverage)` key.
///
/// `id` is fresh per instance — `PositionBook` mints a new one whenever a `CLOSE`
/// entry is replaced at the same key, so diffs correctly see a new position
/// rather than a reused id with a cleared contract list.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub id: Uuid,
    instrument: Instrument,
    direction: Direction,
    leverage: u32,
    contracts: Vec<Contract>,
    margin: HashMap<Uuid, Decimal>,
    loan: HashMap<Uuid, Decimal>,
    open_price: HashMap<Uuid, Decimal>,
    close_price: HashMap<Uuid, Decimal>,
}

impl Position {
    pub fn new(instrument: Instrument, direction: Direction, leverage: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument,
            direction,
            leverage,
            contracts: Vec::new(),
            margin: HashMap::new(),
            loan: HashMap::new(),
            open_price: HashMap::new(),
            close_price: HashMap::new(),
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn leverage(&self) -> u32 {
        self.leverage
    }

    pub fn status(&self) -> PositionStatus {
        if self.contracts.is_empty() {
            PositionStatus::Init
        } else if self.contracts.iter().any(|c| c.status() == ContractStatus::Open) {
            PositionStatus::Open
        } else {
            PositionStatus::Close
        }
    }

    pub fn open_num(&self) -> usize {
        self.contracts.iter().filter(|c| c.status() == ContractStatus::Open).count()
    }

    /// Sum of margin posted for currently open contracts.
    pub fn margin(&self) -> Decimal {
        self.contracts
            .iter()
            .filter(|c| c.status() == ContractStatus::Open)
            .filter_map(|c| self.margin.get(&c.id))
            .sum()
    }

    /// Sum of loan outstanding; loan entries are removed on close, so this tracks open
    /// contracts implicitly.
    pub fn loan(&self) -> Decimal {
        self.loan.values().copied().sum()
    }

    /// Average Open Price, over *all* contracts ever opened at this key.
    pub fn aop(&self) -> Decimal {
        let total: Decimal = self.contracts.iter().filter_map(|c| self.open_price.get(&c.id)).sum();
        total / Decimal::from(self.contracts.len() as u64)
    }

    /// Average Close Price. Only valid once `CLOSE`.
    pub fn acp(&self) -> Result<Decimal> {
        if self.status() != PositionStatus::Close {
            return Err(KernelError::PositionOperationOnTerminal { inst_id: self.instrument.inst_id.clone() });
        }
        let total: Decimal = self.contracts.iter().filter_map(|c| self.close_price.get(&c.id)).sum();
        Ok(total / Decimal::from(self.contracts.len() as u64))
    }

    /// Opens `num` fresh contracts at `price`.
    pub fn open(&mut self, price: Decimal, num: u64) -> Result<()> {
        if self.status() == PositionStatus::Close {
            return Err(KernelError::PositionOperationOnTerminal { inst_id: self.instrument.inst_id.clone() });
        }
        if price <= Decimal::ZERO {
            return Err(KernelError::InvalidTime { reason: format!("open price must be > 0, got {price}") });
        }
        if num == 0 {
            return Err(KernelError::InvalidTime { reason: "open num must be > 0".into() });
        }

        let role = match self.direction {
            Direction::SellShort => ContractRole::Seller,
            Direction::BuyLong => ContractRole::Buyer,
        };
        let contract_size = self.instrument.contract_size;
        let margin = price * contract_size / Decimal::from(self.leverage);
        let loan = price * contract_size - margin;

        for _ in 0..num {
            let contract = Contract::new(self.instrument.clone(), role);
            self.open_price.insert(contract.id, price);
            self.margin.insert(contract.id, margin);
            self.loan.insert(contract.id, loan);
            self.contracts.push(contract);
        }
        Ok(())
    }

    /// Closes the first `num` currently-open contracts (insertion order) at `price`,
    /// returning the settlement credited to quote currency.
    pub fn close(&mut self, price: Decimal, num: u64) -> Result<Decimal> {
        if self.status() == PositionStatus::Close {
            return Err(KernelError::PositionOperationOnTerminal { inst_id: self.instrument.inst_id.clone() });
        }
        if price <= Decimal::ZERO {
            return Err(KernelError::InvalidTime { reason: format!("close price must be > 0, got {price}") });
        }
        let open_num = self.open_num() as u64;
        if num == 0 || num > open_num {
            return Err(KernelError::InvalidTime {
                reason: format!("position with {open_num} open contracts cannot close {num}"),
            });
        }

        let contract_size = self.instrument.contract_size;
        let ids: Vec<Uuid> = self
            .contracts
            .iter()
            .filter(|c| c.status() == ContractStatus::Open)
            .take(num as usize)
            .map(|c| c.id)
            .collect();

        let mut return_value = Decimal::ZERO;
        for id in ids {
            let open_price = self.open_price[&id];
            let delta = match self.direction {
                Direction::BuyLong => price - open_price,
                Direction::SellShort => open_price - price,
            };
            return_value += self.margin[&id] + delta * contract_size;
            self.close_price.insert(id, price);
            self.loan.remove(&id);
            self.margin.remove(&id);
            let contract = self.contracts.iter_mut().find(|c| c.id == id).expect("id came from self.contracts");
            contract.close();
        }

        if return_value < Decimal::ZERO {
            return Err(KernelError::NegativeSettlement { amount: return_value });
        }
        Ok(return_value)
    }

    /// Mark-to-market unrealised P&L over open contracts.
    pub fn uprofit(&self, mark: Decimal) -> Decimal {
        let open_num = self.open_num();
        if open_num == 0 {
            return Decimal::ZERO;
        }
        let opened_aop: Decimal = self
            .contracts
            .iter()
            .filter(|c| c.status() == ContractStatus::Open)
            .filter_map(|c| self.open_price.get(&c.id))
            .sum::<Decimal>()
            / Decimal::from(open_num as u64);
        let delta = match self.direction {
            Direction::BuyLong => mark - opened_aop,
            Direction::SellShort => opened_aop - mark,
        };
        self.instrument.contract_size * Decimal::from(open_num as u64) * delta
    }

    /// `(Margin + UProfit) / (contract_size * OPEN_NUM * mark * (mmr + fee_rate))`
    ///. Callers must guard `open_num() > 0` and `mark > 0` before dividing.
    pub fn margin_rate(&self, mark: Decimal, mmr: Decimal, fee_rate: Decimal) -> Decimal {
        let open_num = Decimal::from(self.open_num() as u64);
        let denom = self.instrument.contract_size * open_num * mark * (mmr + fee_rate);
        if denom.is_zero() {
            return Decimal::MAX;
        }
        (self.margin() + self.uprofit(mark)) / denom
    }

    /// Whether this position matches the given (instrument, direction, leverage) key.
    pub fn matches_key(&self, instrument: &Instrument, direction: Direction, leverage: u32) -> bool {
        &self.instrument == instrument && self.direction == direction && self.leverage == leverage
    }

    /// Whether this position's instrument, leverage, and direction line up with an order's.
    pub fn matches_order(&self, order: &Order) -> bool {
        self.instrument == order.instrument && self.direction == order.direction && self.leverage == order.leverage
    }

    pub fn futures_action_for(&self) -> OrderAction {
        OrderAction::Close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inst() -> Instrument {
        Instrument::new_futures("BTC-USDT-SWAP", "BTC", "USDT", dec!(0.01), dec!(0.1), None, None)
    }

    #[test]
    fn open_records_margin_and_loan() {
        let mut pos = Position::new(inst(), Direction::BuyLong, 10);
        pos.open(dec!(30571.1), 2).unwrap();
        assert_eq!(pos.open_num(), 2);
        // margin per contract = 30571.1 * 0.01 / 10 = 30.5711
        assert_eq!(pos.margin(), dec!(61.1422));
        // loan per contract = 305.711 - 30.5711 = 275.1399
        assert_eq!(pos.loan(), dec!(550.2798));
    }

    #[test]
    fn scenario_long_round_trip() {
        let mut pos = Position::new(inst(), Direction::BuyLong, 10);
        pos.open(dec!(30571.1), 2).unwrap();
        let ret = pos.close(dec!(30567.9), 1).unwrap();
        // margin(30.5711) + (30567.9-30571.1)*0.01 = 30.5711 - 0.032 = 30.5391
        assert_eq!(ret, dec!(30.5391));
        assert_eq!(pos.open_num(), 1);
        assert_eq!(pos.loan(), dec!(275.1399));
        assert_eq!(pos.margin(), dec!(30.5711));
    }

    #[test]
    fn scenario_short_round_trip_profit() {
        let mut pos = Position::new(inst(), Direction::SellShort, 10);
        pos.open(dec!(30580.8), 3).unwrap();
        assert_eq!(pos.open_num(), 3);
        let ret = pos.close(dec!(30432.3), 1).unwrap();
        // margin 30.5808 + (30580.8-30432.3)*0.01 = 30.5808 + 1.485 = 32.0658
        assert_eq!(ret, dec!(32.0658));
    }

    #[test]
    fn close_more_than_open_fails() {
        let mut pos = Position::new(inst(), Direction::BuyLong, 10);
        pos.open(dec!(100), 1).unwrap();
        assert!(pos.close(dec!(100), 2).is_err());
    }

    #[test]
    fn status_transitions() {
        let mut pos = Position::new(inst(), Direction::BuyLong, 10);
        assert_eq!(pos.status(), PositionStatus::Init);
        pos.open(dec!(100), 1).unwrap();
        assert_eq!(pos.status(), PositionStatus::Open);
        pos.close(dec!(110), 1).unwrap();
        assert_eq!(pos.status(), PositionStatus::Close);
        assert!(pos.acp().is_ok());
    }

    #[test]
    fn uprofit_long_vs_short() {
        let mut long = Position::new(inst(), Direction::BuyLong, 10);
        long.open(dec!(100), 2).unwrap();
        assert_eq!(long.uprofit(dec!(110)), dec!(0.01) * dec!(2) * dec!(10));

        let mut short = Position::new(inst(), Direction::SellShort, 10);
        short.open(dec!(100), 2).unwrap();
        assert_eq!(short.uprofit(dec!(90)), dec!(0.01) * dec!(2) * dec!(10));
    }

    #[test]
    fn margin_rate_liquidation_threshold() {
        let mut pos = Position::new(inst(), Direction::BuyLong, 10);
        pos.open(dec!(100), 1).unwrap();
        let healthy = pos.margin_rate(dec!(100), dec!(0.004), dec!(0.0005));
        assert!(healthy > dec!(1));
        // mark crashing against a long should eventually breach 1.0
        let crashed = pos.margin_rate(dec!(50), dec!(0.004), dec!(0.0005));
        assert!(crashed < healthy);
    }
}
