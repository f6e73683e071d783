//! Kernel error types.
//!
//! Hand-rolled `Display`/`Error` impls rather than a `thiserror` derive.

use std::fmt;

use uuid::Uuid;

/// Fatal or order-terminal conditions raised anywhere in the kernel.
///
/// Balance/liquidity shortfalls are *not* represented here — they are folded directly
/// into `Order::insufficient()` by the matching loop and never bubble up as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// `Clock::set`/`Clock::add` invariant violation.
    InvalidTime { reason: String },
    /// No chunk in the reader's index covers the requested timestamp.
    NoDataForTime { ts: i64 },
    /// A price-point reader has no row at or before the requested timestamp.
    NoPriorDataPoint { ts: i64 },
    /// The gap between the last known row and the requested timestamp exceeds `max_interval`.
    DataGapExceeded { last_ts: i64, requested_ts: i64, max_interval: i64 },
    /// A price-point row's value is null at the resolved timestamp.
    NullValue { ts: i64 },
    /// A book row names a side other than ask/bid.
    MalformedRow { detail: String },
    /// A chunk's first row is not a snapshot.
    MissingSnapshotHeader { chunk: String },
    /// Clock moved backwards relative to a reader's `current_ts` (should be unreachable).
    ClockRegressed { current_ts: i64, requested_ts: i64 },
    /// Futures order on an instrument whose quote currency isn't USDT/USDC.
    UnsupportedQuote { quote_ccy: String },
    /// Order against an instrument type the matching engine does not support (e.g. SWAP).
    UnsupportedInstType { inst_id: String },
    /// `Position::close` computed a negative settlement — indicates a missed liquidation.
    NegativeSettlement { amount: rust_decimal::Decimal },
    /// `Order::exe`/`insufficient` called on an order already in a terminal state.
    OrderOperationOnTerminal { order_id: Uuid },
    /// `Position::open`/`close`/`acp` called on a position already `CLOSE`, or `acp`
    /// called before all contracts are closed.
    PositionOperationOnTerminal { inst_id: String },
    /// Limit-order matching is an unimplemented extension seam.
    NotImplemented { detail: String },
    /// A `CreateOrder`/`CancelOrder` event named an exchange not present in the `Environment`.
    UnknownExchange { name: String },
    /// Backtest configuration failed `validate()`.
    InvalidConfig { reason: String },
    /// A `History` snapshot or export failed to serialize/write.
    SerializationFailed { detail: String },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::InvalidTime { reason } => write!(f, "invalid time: {reason}"),
            KernelError::NoDataForTime { ts } => {
                write!(f, "no chunk covers timestamp {ts}")
            }
            KernelError::NoPriorDataPoint { ts } => {
                write!(f, "no prior data point at or before {ts}")
            }
            KernelError::DataGapExceeded { last_ts, requested_ts, max_interval } => write!(
                f,
                "data gap exceeded: last={last_ts} requested={requested_ts} max_interval={max_interval}"
            ),
            KernelError::NullValue { ts } => write!(f, "null value at timestamp {ts}"),
            KernelError::MalformedRow { detail } => write!(f, "malformed row: {detail}"),
            KernelError::MissingSnapshotHeader { chunk } => {
                write!(f, "chunk {chunk} does not begin with a snapshot row")
            }
            KernelError::ClockRegressed { current_ts, requested_ts } => write!(
                f,
                "clock regressed: current_ts={current_ts} requested_ts={requested_ts}"
            ),
            KernelError::UnsupportedQuote { quote_ccy } => {
                write!(f, "unsupported quote currency for futures: {quote_ccy}")
            }
            KernelError::UnsupportedInstType { inst_id } => {
                write!(f, "unsupported instrument type for {inst_id}")
            }
            KernelError::NegativeSettlement { amount } => {
                write!(f, "negative settlement computed: {amount} (missed liquidation)")
            }
            KernelError::OrderOperationOnTerminal { order_id } => {
                write!(f, "operation on terminal order {order_id}")
            }
            KernelError::PositionOperationOnTerminal { inst_id } => {
                write!(f, "operation on terminal/not-yet-closed position for {inst_id}")
            }
            KernelError::NotImplemented { detail } => write!(f, "not implemented: {detail}"),
            KernelError::UnknownExchange { name } => write!(f, "unknown exchange: {name}"),
            KernelError::InvalidConfig { reason } => write!(f, "invalid backtest configuration: {reason}"),
            KernelError::SerializationFailed { detail } => write!(f, "serialization failed: {detail}"),
        }
    }
}

impl std::error::Error for KernelError {}

pub type Result<T> = std::result::Result<T, KernelError>;
