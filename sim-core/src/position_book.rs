//! Keyed collection of `Position`s, one non-`CLOSE` entry per `(instrument, direction,
//! leverage)`.

use crate::error::Result;
use crate::instrument::Instrument;
use crate::order::Direction;
use crate::position::{Position, PositionStatus};

#[derive(Debug, Clone)]
pub struct PositionBook {
    positions: Vec<Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self { positions: Vec::new() }
    }

    /// All currently-tracked positions (closed ones are swept by `close`, not `open`).
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    /// Returns the live (non-`CLOSE`) position for `key`, creating one if absent and
    /// replacing a `CLOSE` entry with a fresh one.
    fn get_or_create(&mut self, instrument: &Instrument, direction: Direction, leverage: u32) -> &mut Position {
        if let Some(idx) = self
            .positions
            .iter()
            .position(|p| p.matches_key(instrument, direction, leverage) && p.status() != PositionStatus::Close)
        {
            return &mut self.positions[idx];
        }
        self.positions.push(Position::new(instrument.clone(), direction, leverage));
        self.positions.last_mut().expect("just pushed")
    }

    pub fn open(&mut self, instrument: &Instrument, direction: Direction, leverage: u32, price: rust_decimal::Decimal, num: u64) -> Result<()> {
        self.get_or_create(instrument, direction, leverage).open(price, num)
    }

    /// Delegates to the matching position's `close`, then sweeps any now-`CLOSE` entries
    /// out of the book.
    pub fn close(
        &mut self,
        instrument: &Instrument,
        direction: Direction,
        leverage: u32,
        price: rust_decimal::Decimal,
        num: u64,
    ) -> Result<rust_decimal::Decimal> {
        let ret = self.get_or_create(instrument, direction, leverage).close(price, num)?;
        self.sweep();
        Ok(ret)
    }

    fn sweep(&mut self) {
        self.positions.retain(|p| p.status() != PositionStatus::Close);
    }
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new()
    }
}
