//! Maps raw audit records onto the event shape shipped to the listener.

use crate::fetch::RawLogRecord;
use serde::{Deserialize, Serialize};

/// A raw record with its key promoted to `name` and a derived timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub name: String,
    pub time: String,
    pub username: String,
    pub ip_address: String,
    pub action: String,
    pub data: String,
    pub timestamp: String,
}

impl NormalizedEvent {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// `YYYY-MM-DD HH:MM:SS` becomes `YYYY-MM-DDTHH:MM:SS.000Z`.
///
/// Only the first space is replaced and the suffix is always appended; the
/// source time is taken to be UTC already, so no conversion happens.
pub fn derive_timestamp(time: &str) -> String {
    format!("{}.000Z", time.replacen(' ', "T", 1))
}

pub fn normalize(key: String, record: RawLogRecord) -> NormalizedEvent {
    let timestamp = derive_timestamp(&record.time);
    NormalizedEvent {
        name: key,
        time: record.time,
        username: record.username,
        ip_address: record.ip_address,
        action: record.action,
        data: record.data,
        timestamp,
    }
}

pub fn normalize_all(records: Vec<(String, RawLogRecord)>) -> Vec<NormalizedEvent> {
    records
        .into_iter()
        .map(|(key, record)| normalize(key, record))
        .collect()
}
