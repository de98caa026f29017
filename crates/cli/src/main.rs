mod config_commands;
mod db_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    parley_config::ParleyConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "parley", about = "parley: WhatsApp auto-reply gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway,
    /// History database management.
    Db {
        #[command(subcommand)]
        action: db_commands::DbAction,
    },
    /// Print the stored interactions for a phone number as JSON lines.
    History {
        /// Phone number without channel prefix, e.g. +15551230000.
        phone: String,
    },
    /// Show how a reply would be split into chunks.
    Chunk {
        /// Maximum chunk size in characters (defaults to reply.max_chunk_len).
        #[arg(long)]
        max: Option<usize>,
        /// Text to split.
        text: String,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit config file if given, otherwise discover one.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ParleyConfig> {
    match path {
        Some(path) => Ok(parley_config::apply_env_overrides(
            parley_config::load_config(path)?,
        )),
        None => Ok(parley_config::discover_and_load()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => {
            info!(version = env!("CARGO_PKG_VERSION"), "parley starting");
            // CLI args override config values
            let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
            let port = cli.port.unwrap_or(config.server.port);
            parley_gateway::start_gateway(&bind, port, config).await
        },
        Some(Commands::Db { action }) => db_commands::handle_db(action, &config).await,
        Some(Commands::History { phone }) => db_commands::print_history(&phone, &config).await,
        Some(Commands::Chunk { max, text }) => {
            let max = max.unwrap_or(config.reply.max_chunk_len);
            for (i, chunk) in parley_auto_reply::chunk::split(&text, max)?.iter().enumerate() {
                println!("[{}] ({} chars) {chunk}", i + 1, chunk.chars().count());
            }
            Ok(())
        },
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
