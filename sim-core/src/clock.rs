//! Monotonic simulation clock.

use crate::error::{KernelError, Result};

/// Integer millisecond timestamp bounded to `[start, end]`, strictly non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Clock {
    start: i64,
    end: i64,
    current: i64,
}

impl Clock {
    /// Creates a clock at `start`. Requires `0 <= start < end`.
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start < 0 || start >= end {
            return Err(KernelError::InvalidTime {
                reason: format!("require 0 <= start < end, got start={start} end={end}"),
            });
        }
        Ok(Self { start, end, current: start })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn now(&self) -> i64 {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.end
    }

    /// Sets the clock to `t`. Requires `start <= t <= end` and `t > current` — strictly
    /// monotonic, `t <= current` is always rejected.
    pub fn set(&mut self, t: i64) -> Result<()> {
        if t < self.start || t > self.end {
            return Err(KernelError::InvalidTime {
                reason: format!("{t} outside [{}, {}]", self.start, self.end),
            });
        }
        if t <= self.current {
            return Err(KernelError::InvalidTime {
                reason: format!("clock must strictly advance: {t} <= current {}", self.current),
            });
        }
        self.current = t;
        Ok(())
    }

    /// Advances the clock by `delta`, clamped to `end`. Requires the clamped result to be
    /// strictly greater than the current value (else fails, e.g. `delta <= 0` at `end`).
    pub fn add(&mut self, delta: i64) -> Result<()> {
        let next = (self.current + delta).min(self.end);
        if next <= self.current {
            return Err(KernelError::InvalidTime {
                reason: format!(
                    "add({delta}) would not strictly advance clock past {}",
                    self.current
                ),
            });
        }
        self.current = next;
        Ok(())
    }
}
