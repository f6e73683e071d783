//! Per-currency non-negative balance ledger.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{KernelError, Result};

#[derive(Debug, Clone, Default)]
pub struct Balance {
    by_ccy: HashMap<String, Decimal>,
}

impl Balance {
    pub fn new(initial: impl IntoIterator<Item = (String, Decimal)>) -> Result<Self> {
        let mut balance = Self::default();
        for (ccy, value) in initial {
            balance.set(&ccy, value)?;
        }
        Ok(balance)
    }

    /// Reads `ccy`'s balance, defaulting to zero for an unseen currency.
    pub fn get(&self, ccy: &str) -> Decimal {
        self.by_ccy.get(ccy).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sets `ccy`'s balance. Rejects negative values.
    pub fn set(&mut self, ccy: &str, value: Decimal) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(KernelError::InvalidTime { reason: format!("balance for {ccy} would go negative: {value}") });
        }
        self.by_ccy.insert(ccy.to_string(), value);
        Ok(())
    }

    pub fn add(&mut self, ccy: &str, amount: Decimal) -> Result<()> {
        self.set(ccy, self.get(ccy) + amount)
    }

    pub fn sub(&mut self, ccy: &str, amount: Decimal) -> Result<()> {
        self.set(ccy, self.get(ccy) - amount)
    }

    pub fn as_map(&self) -> &HashMap<String, Decimal> {
        &self.by_ccy
    }
}
