//! Backtest configuration: a plain serde struct plus a `validate()` method, loaded from
//! TOML at the CLI layer.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::history::HistLevel;

/// `{ strategy, start, end, eval_step>0, hist_level, exchanges: [name],
/// initial_balance: {name: {ccy: amount}}, stop_condition? }`, plus the
/// kernel-level knobs (`data_root`, `max_interval`, `mid_window`) every `Exchange`
/// needs to construct its readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Name of the strategy to construct; interpreted by the CLI, not by the kernel.
    pub strategy: String,
    pub start: i64,
    pub end: i64,
    pub eval_step: i64,
    #[serde(default = "default_hist_level")]
    pub hist_level: HistLevel,
    pub exchanges: Vec<String>,
    pub initial_balance: HashMap<String, HashMap<String, Decimal>>,
    /// Root of the `<root>/books|markprices|indexprices/<instId>/part-...` layout.
    pub data_root: String,
    #[serde(default = "default_max_interval")]
    pub max_interval: i64,
    #[serde(default = "default_mid_window")]
    pub mid_window: usize,
    /// Name of a named stop condition the CLI resolves; the kernel itself treats
    /// `stop_condition` as opaque.
    #[serde(default)]
    pub stop_condition: Option<String>,
}

fn default_hist_level() -> HistLevel {
    HistLevel::Info
}

fn default_max_interval() -> i64 {
    2000
}

fn default_mid_window() -> usize {
    1
}

impl BacktestConfig {
    /// `start < end`, `eval_step > 0`, and at least one exchange.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(KernelError::InvalidConfig {
                reason: format!("start ({}) must be before end ({})", self.start, self.end),
            });
        }
        if self.eval_step <= 0 {
            return Err(KernelError::InvalidConfig {
                reason: format!("eval_step must be a positive integer, got {}", self.eval_step),
            });
        }
        if self.exchanges.is_empty() {
            return Err(KernelError::InvalidConfig { reason: "exchanges list must be non-empty".into() });
        }
        for name in &self.exchanges {
            if !self.initial_balance.contains_key(name) {
                return Err(KernelError::InvalidConfig {
                    reason: format!("no initial_balance entry for exchange {name}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_config() -> BacktestConfig {
        BacktestConfig {
            strategy: "simple_spread".into(),
            start: 0,
            end: 10_000,
            eval_step: 1000,
            hist_level: HistLevel::Info,
            exchanges: vec!["OKX".into()],
            initial_balance: HashMap::from([("OKX".to_string(), HashMap::from([("USDT".to_string(), dec!(1000))]))]),
            data_root: "/data".into(),
            max_interval: 2000,
            mid_window: 1,
            stop_condition: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_start_ge_end() {
        let mut cfg = base_config();
        cfg.start = cfg.end;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_eval_step() {
        let mut cfg = base_config();
        cfg.eval_step = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_exchange_without_initial_balance() {
        let mut cfg = base_config();
        cfg.exchanges.push("BINANCE".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = base_config();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: BacktestConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.start, cfg.start);
        assert_eq!(parsed.exchanges, cfg.exchanges);
    }
}
