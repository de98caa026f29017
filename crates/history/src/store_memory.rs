//! In-memory store for tests and dry runs.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use {async_trait::async_trait, parley_common::types::Interaction};

use crate::{
    Result,
    store::{HistoryStore, SchemaStatus},
};

/// In-memory store backed by `HashMap`. No persistence.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    // phone -> timestamp -> interaction
    rows: Mutex<HashMap<String, BTreeMap<String, Interaction>>>,
    queries: Mutex<Vec<String>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phones passed to `query_by_phone`, in call order.
    pub fn queried_phones(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Total interactions across all phones.
    pub fn len(&self) -> usize {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus> {
        Ok(SchemaStatus::Existing)
    }

    async fn query_by_phone(&self, phone: &str) -> Result<Vec<Interaction>> {
        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(phone.to_string());
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .get(phone)
            .map(|by_ts| by_ts.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn append(&self, interaction: &Interaction) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.entry(interaction.phone.clone())
            .or_default()
            .insert(interaction.timestamp.clone(), interaction.clone());
        Ok(())
    }

    async fn delete_phone(&self, phone: &str) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.remove(phone).map_or(0, |by_ts| by_ts.len() as u64))
    }
}
