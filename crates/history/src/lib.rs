//! Interaction history keyed by sender phone and timestamp.
//!
//! [`store::HistoryStore`] is the seam the reply pipeline talks to; SQLite is
//! the production backend and [`store_memory::InMemoryHistoryStore`] backs
//! tests.

pub mod error;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;

pub use {
    error::{Error, Operation, Result},
    store::{HistoryStore, SchemaStatus},
    store_memory::InMemoryHistoryStore,
    store_sqlite::SqliteHistoryStore,
};

use {
    chrono::{DateTime, Utc},
    parley_common::types::Interaction,
};

/// Format an instant as an interaction sort key.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(Interaction::TIMESTAMP_FORMAT).to_string()
}
