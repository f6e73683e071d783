//! One indivisible unit of a futures lot, living inside exactly one `Position`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::instrument::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractRole {
    Buyer,
    Seller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Open,
    Close,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub instrument: Instrument,
    pub role: ContractRole,
    status: ContractStatus,
}

impl Contract {
    pub fn new(instrument: Instrument, role: ContractRole) -> Self {
        Self { id: Uuid::new_v4(), instrument, role, status: ContractStatus::Open }
    }

    pub fn status(&self) -> ContractStatus {
        self.status
    }

    pub fn close(&mut self) {
        self.status = ContractStatus::Close;
    }
}
