use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::StoreError;

pub const PAYLOAD_VERSION: u32 = 1;

/// Durable key-value boundary holding the whole serialized ledger.
pub trait LedgerStore {
    /// `Ok(None)` when nothing has been saved yet.
    fn load_ledger(&self) -> Result<Option<String>, StoreError>;
    fn save_ledger(&mut self, payload: &str) -> Result<(), StoreError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Box<S> {
    fn load_ledger(&self) -> Result<Option<String>, StoreError> {
        (**self).load_ledger()
    }

    fn save_ledger(&mut self, payload: &str) -> Result<(), StoreError> {
        (**self).save_ledger(payload)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    payload: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            saves: 0,
        }
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl LedgerStore for MemoryStore {
    fn load_ledger(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload.clone())
    }

    fn save_ledger(&mut self, payload: &str) -> Result<(), StoreError> {
        self.payload = Some(payload.to_string());
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) series_id: Option<String>,
    pub(crate) position: f64,
    pub(crate) duration: f64,
    pub(crate) updated_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedLedger {
    version: u32,
    entries: BTreeMap<String, ProgressRecord>,
}

pub(crate) fn encode_ledger(
    entries: &HashMap<String, ProgressRecord>,
) -> Result<String, StoreError> {
    let persisted = PersistedLedger {
        version: PAYLOAD_VERSION,
        entries: entries
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect(),
    };
    serde_json::to_string(&persisted).map_err(|err| StoreError::Corrupt(err.to_string()))
}

pub(crate) fn decode_ledger(raw: &str) -> Result<HashMap<String, ProgressRecord>, StoreError> {
    let persisted: PersistedLedger =
        serde_json::from_str(raw).map_err(|err| StoreError::Corrupt(err.to_string()))?;
    if persisted.version != PAYLOAD_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported payload version {}",
            persisted.version
        )));
    }
    Ok(persisted.entries.into_iter().collect())
}
