//! In-process store for asynchronous webhook payloads.
//!
//! Copyleaks reports scan and export results through callbacks that arrive
//! after the submitting request has returned. Each callback is parked here
//! under a [`CorrelationKey`] until a client polls for it. Records live until
//! the process exits, or until the optional TTL passes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Identifies one webhook payload within a scan session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CorrelationKey {
    /// Full comparison result for a scan.
    Completed(String),
    /// Crawled source document exported for a scan.
    Source(String),
    /// Detailed payload for one matched result.
    Result { scan_id: String, result_id: String },
}

impl CorrelationKey {
    pub fn scan_id(&self) -> &str {
        match self {
            CorrelationKey::Completed(scan_id)
            | CorrelationKey::Source(scan_id)
            | CorrelationKey::Result { scan_id, .. } => scan_id,
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationKey::Completed(scan_id) => write!(f, "completed-{}", scan_id),
            CorrelationKey::Source(scan_id) => write!(f, "source-{}", scan_id),
            CorrelationKey::Result { scan_id, result_id } => write!(f, "result-{}-{}", scan_id, result_id),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRecord {
    pub key: String,
    pub scan_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

pub struct CorrelationStore {
    records: RwLock<HashMap<CorrelationKey, CorrelationRecord>>,
    ttl: Option<chrono::Duration>,
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ttl: None,
        }
    }

    /// Records older than `ttl` read as absent and are dropped on the next write.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).ok(),
        }
    }

    /// Insert or replace the record for `key`. Last write wins.
    pub fn put(&self, key: CorrelationKey, data: Value) -> CorrelationRecord {
        let record = CorrelationRecord {
            key: key.to_string(),
            scan_id: key.scan_id().to_string(),
            data,
            timestamp: Utc::now(),
        };

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(ttl) = self.ttl {
            let now = Utc::now();
            records.retain(|_, existing| now - existing.timestamp < ttl);
        }
        records.insert(key, record.clone());
        record
    }

    pub fn get(&self, key: &CorrelationKey) -> Option<CorrelationRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let record = records.get(key)?;
        if self.is_expired(record) {
            return None;
        }
        Some(record.clone())
    }

    /// Live keys in their string form, sorted for stable output.
    pub fn keys(&self) -> Vec<String> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = records
            .values()
            .filter(|record| !self.is_expired(record))
            .map(|record| record.key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, record: &CorrelationRecord) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() - record.timestamp >= ttl,
            None => false,
        }
    }
}
