//! Rolling best-bid/ask midpoint, sampled like `BookReplay` but window-averaged.
//! Used as a mark-price fallback when dedicated mark-price data are absent.

use std::collections::VecDeque;

use rust_decimal::Decimal;

use crate::book::{BookSide, OrderBook, DEFAULT_MAX_DEPTH};
use crate::chunk_source::{find_covering_chunk, BookChunkSource, RowAction};
use crate::error::{KernelError, Result};

pub struct MidPriceTracker {
    source: Box<dyn BookChunkSource>,
    max_interval: i64,
    window: usize,
    book: OrderBook,
    current_index: Option<usize>,
    current_ts: i64,
    rows: Vec<crate::chunk_source::BookRow>,
    chunked_index: usize,
    hist: VecDeque<Decimal>,
}

impl MidPriceTracker {
    pub fn new(source: Box<dyn BookChunkSource>, window: usize, max_interval: i64) -> Self {
        Self {
            source,
            max_interval,
            window: window.max(1),
            book: OrderBook::new(DEFAULT_MAX_DEPTH),
            current_index: None,
            current_ts: -1,
            rows: Vec::new(),
            chunked_index: 0,
            hist: VecDeque::new(),
        }
    }

    /// Arithmetic mean of the midpoint window at or before `clock`.
    pub fn now(&mut self, clock: i64) -> Result<Decimal> {
        self.update(clock)?;
        if self.hist.is_empty() {
            return Err(KernelError::NoPriorDataPoint { ts: clock });
        }
        let sum: Decimal = self.hist.iter().copied().sum();
        Ok(sum / Decimal::from(self.hist.len()))
    }

    fn update(&mut self, clock: i64) -> Result<()> {
        if self.current_ts == clock {
            return Ok(());
        }

        let idx = find_covering_chunk(self.source.chunk_ranges(), clock);
        let changed = match idx {
            Some(i) if self.current_index != Some(i) => {
                self.current_index = Some(i);
                true
            }
            Some(_) => false,
            None if self.current_index.is_none() => return Err(KernelError::NoDataForTime { ts: clock }),
            None => false,
        };

        if changed {
            self.load_new_chunk()?;
        }

        if clock < self.current_ts {
            return Err(KernelError::ClockRegressed { current_ts: self.current_ts, requested_ts: clock });
        }

        while self.chunked_index < self.rows.len() && self.rows[self.chunked_index].timestamp <= clock {
            let row = self.rows[self.chunked_index];
            if self.current_ts != -1 && (row.timestamp - self.current_ts).abs() > self.max_interval {
                return Err(KernelError::DataGapExceeded {
                    last_ts: self.current_ts,
                    requested_ts: row.timestamp,
                    max_interval: self.max_interval,
                });
            }
            let ts_changed = row.timestamp != self.current_ts;
            self.apply_row(row);
            if ts_changed && self.has_top_of_book() {
                self.current_ts = row.timestamp;
                self.sample();
            }
            self.chunked_index += 1;
        }

        if self.has_top_of_book() {
            self.sample();
        }
        self.current_ts = clock;
        Ok(())
    }

    fn load_new_chunk(&mut self) -> Result<()> {
        let idx = self.current_index.expect("changed implies Some");
        let rows = self.source.load_chunk(idx)?;
        let first = rows.first().ok_or_else(|| KernelError::MissingSnapshotHeader {
            chunk: format!("index {idx}"),
        })?;
        if first.action != RowAction::Snapshot {
            return Err(KernelError::MissingSnapshotHeader { chunk: format!("index {idx}") });
        }
        let initial_ts = first.timestamp;

        let mut chunked_index = 0;
        for row in &rows {
            if row.action != RowAction::Snapshot || row.timestamp != initial_ts {
                break;
            }
            self.apply_row(*row);
            chunked_index += 1;
        }
        self.rows = rows;
        self.chunked_index = chunked_index;
        self.current_ts = initial_ts;
        if self.has_top_of_book() {
            self.sample();
        }
        Ok(())
    }

    fn apply_row(&mut self, row: crate::chunk_source::BookRow) {
        self.book.set(row.side, row.price, row.size, row.count);
    }

    fn has_top_of_book(&self) -> bool {
        self.book.best_ask().is_some() && self.book.best_bid().is_some()
    }

    fn sample(&mut self) {
        let mid = (self.book.best_ask().unwrap().price + self.book.best_bid().unwrap().price)
            / Decimal::from(2);
        if self.hist.len() == self.window {
            self.hist.pop_front();
        }
        self.hist.push_back(mid);
    }
}
