//! SQLite-backed history store using sqlx.

use {
    async_trait::async_trait,
    parley_common::types::Interaction,
    sqlx::{SqlitePool, sqlite::SqlitePoolOptions},
    tracing::{debug, error, info},
};

#[cfg(feature = "metrics")]
use parley_metrics::{counter, history as history_metrics, labels};

use crate::{
    Error, Operation, Result,
    store::{HistoryStore, SchemaStatus},
};

/// SQLite persistence for interactions, one row per `(phone, timestamp)`.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteHistoryStore {
    /// Connect a new pool. Call [`HistoryStore::ensure_schema`] before use.
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!(database_url, error = %e, "failed to connect to history database");
                Error::unavailable(Operation::Connect, e)
            })?;
        Self::with_pool(pool, table)
    }

    /// Use an existing pool.
    ///
    /// The table name is interpolated into SQL, so it must be a plain
    /// identifier.
    pub fn with_pool(pool: SqlitePool, table: &str) -> Result<Self> {
        if !parley_config::is_sql_identifier(table) {
            return Err(Error::InvalidTable {
                table: table.to_string(),
            });
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    async fn table_exists(&self) -> std::result::Result<bool, sqlx::Error> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(&self.table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

fn record(operation: Operation, ok: bool) {
    #[cfg(feature = "metrics")]
    {
        counter!(
            history_metrics::OPERATIONS_TOTAL,
            labels::OPERATION => operation.as_str()
        )
        .increment(1);
        if !ok {
            counter!(
                history_metrics::ERRORS_TOTAL,
                labels::OPERATION => operation.as_str()
            )
            .increment(1);
        }
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (operation, ok);
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn ensure_schema(&self) -> Result<SchemaStatus> {
        let op = Operation::EnsureSchema;
        let exists = self.table_exists().await.map_err(|e| {
            record(op, false);
            error!(table = %self.table, operation = %op, error = %e, "couldn't check for history table");
            Error::unavailable(op, e)
        })?;
        if exists {
            record(op, true);
            debug!(table = %self.table, "history table exists");
            return Ok(SchemaStatus::Existing);
        }

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                phone            TEXT NOT NULL,
                timestamp        TEXT NOT NULL,
                name             TEXT NOT NULL DEFAULT '',
                received_message TEXT,
                sent_message     TEXT NOT NULL,
                PRIMARY KEY (phone, timestamp)
            )",
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await.map_err(|e| {
            record(op, false);
            error!(table = %self.table, operation = %op, error = %e, "couldn't create history table");
            Error::unavailable(op, e)
        })?;

        record(op, true);
        info!(table = %self.table, "created history table");
        Ok(SchemaStatus::Created)
    }

    async fn query_by_phone(&self, phone: &str) -> Result<Vec<Interaction>> {
        let op = Operation::Query;
        let sql = format!(
            "SELECT phone, timestamp, name, received_message, sent_message
             FROM {}
             WHERE phone = ?
             ORDER BY timestamp ASC",
            self.table
        );
        let rows = sqlx::query_as::<_, (String, String, String, Option<String>, String)>(&sql)
            .bind(phone)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                record(op, false);
                error!(phone, table = %self.table, operation = %op, error = %e, "couldn't query interactions");
                Error::store(op, phone, None, e)
            })?;

        record(op, true);
        Ok(rows
            .into_iter()
            .map(|r| Interaction {
                phone: r.0,
                timestamp: r.1,
                name: r.2,
                received_message: r.3,
                sent_message: r.4,
            })
            .collect())
    }

    async fn append(&self, interaction: &Interaction) -> Result<()> {
        let op = Operation::Append;
        let sql = format!(
            "INSERT INTO {} (phone, timestamp, name, received_message, sent_message)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(phone, timestamp) DO UPDATE SET
                name = excluded.name,
                received_message = excluded.received_message,
                sent_message = excluded.sent_message",
            self.table
        );
        sqlx::query(&sql)
            .bind(&interaction.phone)
            .bind(&interaction.timestamp)
            .bind(&interaction.name)
            .bind(&interaction.received_message)
            .bind(&interaction.sent_message)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                record(op, false);
                error!(
                    phone = %interaction.phone,
                    timestamp = %interaction.timestamp,
                    table = %self.table,
                    operation = %op,
                    error = %e,
                    "couldn't add interaction"
                );
                Error::store(
                    op,
                    interaction.phone.clone(),
                    Some(interaction.timestamp.clone()),
                    e,
                )
            })?;

        record(op, true);
        Ok(())
    }

    async fn delete_phone(&self, phone: &str) -> Result<u64> {
        let op = Operation::Delete;
        let sql = format!("DELETE FROM {} WHERE phone = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(phone)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                record(op, false);
                error!(phone, table = %self.table, operation = %op, error = %e, "couldn't delete interactions");
                Error::store(op, phone, None, e)
            })?;

        record(op, true);
        Ok(result.rows_affected())
    }
}
