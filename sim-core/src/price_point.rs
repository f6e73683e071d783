//! Latest-known scalar price (mark / index) at or before the clock.
//!
//! `PricePoint` exposes multiplication symmetrically in both operand positions: a
//! right-hand multiply is always a multiply, never a division in disguise.

use std::ops::{Add, Mul, Sub};

use rust_decimal::Decimal;

use crate::chunk_source::{find_covering_chunk, PriceChunkSource};
use crate::error::{KernelError, Result};

pub struct PricePoint {
    source: Box<dyn PriceChunkSource>,
    max_interval: i64,
    current_index: Option<usize>,
    current_ts: i64,
    rows: Vec<crate::chunk_source::PriceRow>,
    value: Decimal,
}

impl PricePoint {
    pub fn new(source: Box<dyn PriceChunkSource>, max_interval: i64) -> Self {
        Self {
            source,
            max_interval,
            current_index: None,
            current_ts: -1,
            rows: Vec::new(),
            value: Decimal::ZERO,
        }
    }

    /// Lazily resolves the value at or before `clock`.
    pub fn update(&mut self, clock: i64) -> Result<()> {
        if self.current_ts == clock {
            return Ok(());
        }

        let idx = find_covering_chunk(self.source.chunk_ranges(), clock);
        match idx {
            Some(i) if self.current_index != Some(i) => {
                self.current_index = Some(i);
                self.rows = self.source.load_chunk(i)?;
            }
            Some(_) => {}
            None if self.current_index.is_none() => {
                return Err(KernelError::NoDataForTime { ts: clock });
            }
            None => {}
        }

        // Largest row with timestamp <= clock (binary search since rows are non-decreasing).
        let pos = self.rows.partition_point(|r| r.timestamp <= clock);
        if pos == 0 {
            return Err(KernelError::NoPriorDataPoint { ts: clock });
        }
        let row = self.rows[pos - 1];

        if clock - row.timestamp > self.max_interval {
            return Err(KernelError::DataGapExceeded {
                last_ts: row.timestamp,
                requested_ts: clock,
                max_interval: self.max_interval,
            });
        }

        self.value = row.value.ok_or(KernelError::NullValue { ts: row.timestamp })?;
        self.current_ts = clock;
        Ok(())
    }

    /// Returns the resolved value, calling `update(clock)` first so every read is
    /// lazily refreshed.
    pub fn now(&mut self, clock: i64) -> Result<Decimal> {
        self.update(clock)?;
        Ok(self.value)
    }
}

/// A resolved price value, detached from the lazy reader, for ergonomic arithmetic at
/// call sites that have already paid for `PricePoint::now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriceValue(pub Decimal);

impl PriceValue {
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add<Decimal> for PriceValue {
    type Output = Decimal;
    fn add(self, rhs: Decimal) -> Decimal {
        self.0 + rhs
    }
}

impl Sub<Decimal> for PriceValue {
    type Output = Decimal;
    fn sub(self, rhs: Decimal) -> Decimal {
        self.0 - rhs
    }
}

impl Mul<Decimal> for PriceValue {
    type Output = Decimal;
    fn mul(self, rhs: Decimal) -> Decimal {
        self.0 * rhs
    }
}

impl Mul<PriceValue> for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: PriceValue) -> Decimal {
        self * rhs.0
    }
}
