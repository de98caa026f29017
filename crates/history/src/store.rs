//! Persistence trait for interaction history.

use {async_trait::async_trait, parley_common::types::Interaction};

use crate::Result;

/// Outcome of [`HistoryStore::ensure_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The keyed store already existed.
    Existing,
    /// The keyed store was created by this call.
    Created,
}

/// Interaction history keyed by `(phone, timestamp)`.
///
/// Implementations log failures with the phone and operation before
/// returning them. They never retry and never cache.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create the keyed store if missing. Safe to call repeatedly.
    async fn ensure_schema(&self) -> Result<SchemaStatus>;

    /// All interactions recorded for `phone`, oldest first.
    async fn query_by_phone(&self, phone: &str) -> Result<Vec<Interaction>>;

    /// Record one interaction. An existing record with the same
    /// `(phone, timestamp)` is overwritten.
    async fn append(&self, interaction: &Interaction) -> Result<()>;

    /// Remove every interaction for `phone`, returning how many were removed.
    async fn delete_phone(&self, phone: &str) -> Result<u64>;
}
