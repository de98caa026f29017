use clap::Subcommand;

use {
    parley_config::ParleyConfig,
    parley_history::{HistoryStore, SchemaStatus, SqliteHistoryStore},
};

#[derive(Subcommand)]
pub enum DbAction {
    /// Create the history table if it does not exist.
    Init,
    /// Delete every stored interaction for a phone number.
    Forget {
        /// Phone number without channel prefix.
        phone: String,
    },
}

async fn open_store(config: &ParleyConfig) -> anyhow::Result<SqliteHistoryStore> {
    Ok(SqliteHistoryStore::connect(&config.history.database_url, &config.history.table).await?)
}

pub async fn handle_db(action: DbAction, config: &ParleyConfig) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    match action {
        DbAction::Init => match store.ensure_schema().await? {
            SchemaStatus::Created => println!("Created table '{}'.", store.table()),
            SchemaStatus::Existing => println!("Table '{}' already exists.", store.table()),
        },
        DbAction::Forget { phone } => {
            let removed = store.delete_phone(&phone).await?;
            println!("Removed {removed} interaction(s) for {phone}.");
        },
    }
    Ok(())
}

pub async fn print_history(phone: &str, config: &ParleyConfig) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let interactions = store.query_by_phone(phone).await?;
    if interactions.is_empty() {
        eprintln!("No interactions recorded for {phone}.");
    }
    for interaction in &interactions {
        println!("{}", serde_json::to_string(interaction)?);
    }
    Ok(())
}
