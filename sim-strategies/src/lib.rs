//! Example `Strategy` implementations over the `sim-core` kernel.
//!
//! Both strategies here trade with market orders only, since the kernel does not match
//! resting limit orders (`sim_core::error::KernelError::NotImplemented`). `simple_spread`
//! reacts to mid-price deviation from a rolling anchor; `inventory_based` rebalances a
//! target holding of the base currency, with `volatility` available to scale order size
//! down in choppy markets.

pub mod inventory_based;
pub mod simple_spread;
pub mod volatility;

#[cfg(test)]
mod test_helpers;

pub use inventory_based::InventoryBasedStrategy;
pub use simple_spread::SimpleSpreadStrategy;
