//! Deduplicated, hash-gated snapshot log: appends only when the environment's content
//! hash differs from the previous snapshot.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::environment::Environment;
use crate::error::{KernelError, Result};

/// Verbosity of recorded history. Both levels record identical content today —
/// `hist_level` is carried through to the export for downstream consumers that may
/// choose to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistLevel {
    Debug,
    Info,
}

/// Append-only log of environment snapshots, one entry per distinct observed state.
pub struct History {
    level: HistLevel,
    entries: Vec<Value>,
    last_hash: Option<u64>,
}

impl History {
    pub fn new(level: HistLevel) -> Self {
        Self { level, entries: Vec::new(), last_hash: None }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.entries.get(index)
    }

    /// Records `env`'s current state, unless its content hash matches the previous
    /// snapshot.
    pub fn snapshot(&mut self, env: &Environment) -> Result<()> {
        let value = Self::build_snapshot(env)?;
        let serialized = serde_json::to_string(&value)
            .map_err(|e| KernelError::SerializationFailed { detail: e.to_string() })?;
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        let hash = hasher.finish();

        if self.last_hash == Some(hash) {
            return Ok(());
        }
        self.last_hash = Some(hash);
        self.entries.push(value);
        Ok(())
    }

    fn build_snapshot(env: &Environment) -> Result<Value> {
        let mut exchanges = serde_json::Map::new();
        for (name, exchange) in env.exchanges() {
            let positions: Vec<&crate::position::Position> = exchange.positions().collect();
            let snap = serde_json::json!({
                "simTime": env.sim_time(),
                "orders": exchange.orders(),
                "balance": exchange.balance().as_map(),
                "positions": positions,
            });
            exchanges.insert(name.clone(), snap);
        }
        Ok(serde_json::json!({
            "simTime": env.sim_time(),
            "exchanges": Value::Object(exchanges),
        }))
    }

    /// Full export of the accumulated run: history level plus every recorded snapshot.
    pub fn as_json(&self) -> Value {
        serde_json::json!({
            "hist_level": self.level,
            "history": self.entries,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.as_json())
            .map_err(|e| KernelError::SerializationFailed { detail: e.to_string() })?;
        std::fs::write(path, json).map_err(|e| KernelError::SerializationFailed { detail: e.to_string() })
    }
}
