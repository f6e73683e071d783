//! sim-core: the deterministic backtesting and accounting kernel for crypto derivatives
//! and spot trading.
//!
//! Given historical order-book updates, mark prices, and index prices, the kernel
//! reconstructs per-instrument limit order books from chunked snapshot+update streams,
//! matches market orders against resting liquidity, and maintains leveraged futures
//! positions — margin, loan, unrealised P&L, forced liquidation, and expiry delivery —
//! all driven from a monotonic simulation clock.
//!
//! ## Modules
//! - [`clock`] — the monotonic simulation clock.
//! - [`instrument`] — immutable instrument descriptors.
//! - [`chunk_source`] / [`parquet_source`] — chunked historical data, trait + disk adapter.
//! - [`book`] / [`book_replay`] — the per-instrument order book and its reconstruction.
//! - [`price_point`] / [`mid_price_tracker`] — mark/index price readers.
//! - [`order`] / [`contract`] / [`position`] / [`position_book`] — order and position
//!   lifecycle.
//! - [`balance`] — per-currency ledger.
//! - [`market_data`] / [`exchange`] — the per-venue matching and accounting kernel.
//! - [`environment`] / [`event`] / [`world`] — the outer strategy-driven event loop.
//! - [`history`] — deduplicated snapshot log.
//! - [`config`] — backtest configuration.
//! - [`logging`] — tracing initialisation.

pub mod balance;
pub mod book;
pub mod book_replay;
pub mod chunk_source;
pub mod clock;
pub mod config;
pub mod contract;
pub mod environment;
pub mod error;
pub mod event;
pub mod exchange;
pub mod history;
pub mod instrument;
pub mod logging;
pub mod market_data;
pub mod mid_price_tracker;
pub mod order;
pub mod parquet_source;
pub mod position;
pub mod position_book;
pub mod price_point;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(not(any(test, feature = "testing")))]
mod testing;

pub mod world;

pub use error::{KernelError, Result};

/// Convenient imports for crates that drive a backtest (strategies, CLI binaries).
pub mod prelude {
    pub use crate::balance::Balance;
    pub use crate::book::{BookLevel, BookSide, OrderBook};
    pub use crate::clock::Clock;
    pub use crate::config::BacktestConfig;
    pub use crate::environment::{Environment, Strategy};
    pub use crate::error::{KernelError, Result};
    pub use crate::event::{CancelOrder, CreateOrder, Event};
    pub use crate::exchange::{Exchange, FeeRate, FeeSchedule};
    pub use crate::history::{HistLevel, History};
    pub use crate::instrument::{Instrument, InstrumentType};
    pub use crate::order::{Direction, Order, OrderAction, OrderStatus, OrderType};
    pub use crate::parquet_source::ParquetDataSourceFactory;
    pub use crate::position::{Position, PositionStatus};
    pub use crate::world::World;
}
