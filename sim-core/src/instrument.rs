//! Instrument descriptor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `SPOT`, `FUTURES`, or `SWAP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum InstrumentType {
    Spot = 0,
    Futures = 1,
    Swap = 2,
}

/// Immutable instrument descriptor. Two instruments are equal iff `inst_id` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub inst_id: String,
    pub base_ccy: String,
    pub quote_ccy: String,
    pub inst_type: InstrumentType,
    pub list_time: Option<i64>,
    pub exp_time: Option<i64>,
    /// Required (`> 0`) for FUTURES; meaningless for SPOT.
    pub contract_size: Decimal,
    pub tick_size: Decimal,
}

impl Instrument {
    pub fn new_spot(
        inst_id: impl Into<String>,
        base_ccy: impl Into<String>,
        quote_ccy: impl Into<String>,
        tick_size: Decimal,
    ) -> Self {
        Self {
            inst_id: inst_id.into(),
            base_ccy: base_ccy.into(),
            quote_ccy: quote_ccy.into(),
            inst_type: InstrumentType::Spot,
            list_time: None,
            exp_time: None,
            contract_size: Decimal::ONE,
            tick_size,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_futures(
        inst_id: impl Into<String>,
        base_ccy: impl Into<String>,
        quote_ccy: impl Into<String>,
        contract_size: Decimal,
        tick_size: Decimal,
        list_time: Option<i64>,
        exp_time: Option<i64>,
    ) -> Self {
        Self {
            inst_id: inst_id.into(),
            base_ccy: base_ccy.into(),
            quote_ccy: quote_ccy.into(),
            inst_type: InstrumentType::Futures,
            list_time,
            exp_time,
            contract_size,
            tick_size,
        }
    }

    /// True once `exp_time` is set and has been reached by `clock`.
    pub fn is_delivered_at(&self, clock_ts: i64) -> bool {
        matches!(self.exp_time, Some(end_ts) if end_ts <= clock_ts)
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.inst_id == other.inst_id
    }
}
impl Eq for Instrument {}

impl std::hash::Hash for Instrument {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inst_id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn equality_is_by_inst_id_only() {
        let a = Instrument::new_spot("BTC-USDT", "BTC", "USDT", dec!(0.01));
        let mut b = Instrument::new_spot("BTC-USDT", "ETH", "USDC", dec!(1));
        b.contract_size = dec!(5);
        assert_eq!(a, b);
    }

    #[test]
    fn different_inst_id_not_equal() {
        let a = Instrument::new_spot("BTC-USDT", "BTC", "USDT", dec!(0.01));
        let b = Instrument::new_spot("ETH-USDT", "BTC", "USDT", dec!(0.01));
        assert_ne!(a, b);
    }

    #[test]
    fn delivery_check() {
        let inst = Instrument::new_futures(
            "BTC-USDT-PERP",
            "BTC",
            "USDT",
            dec!(0.01),
            dec!(0.1),
            None,
            Some(1000),
        );
        assert!(!inst.is_delivered_at(999));
        assert!(inst.is_delivered_at(1000));
        assert!(inst.is_delivered_at(1500));
    }

    #[test]
    fn spot_never_delivers() {
        let inst = Instrument::new_spot("BTC-USDT", "BTC", "USDT", dec!(0.01));
        assert!(!inst.is_delivered_at(i64::MAX));
    }
}
