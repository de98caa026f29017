use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::ParleyConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["parley.toml", "parley.yaml", "parley.yml", "parley.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ParleyConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./parley.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/parley/parley.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ParleyConfig::default()` if no config file is found. A file that
/// exists but cannot be read or parsed is an error. Environment overrides are
/// applied on success.
pub fn discover_and_load() -> Result<ParleyConfig> {
    load_discovered(find_config_file()).map(apply_env_overrides)
}

fn load_discovered(path: Option<PathBuf>) -> Result<ParleyConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).with_context(|| format!("failed to load {}", path.display()))
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(ParleyConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/parley/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parley").map(|d| d.config_dir().to_path_buf())
}

/// Apply `PARLEY_*` environment variables on top of a loaded config.
pub fn apply_env_overrides(config: ParleyConfig) -> ParleyConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: ParleyConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ParleyConfig {
    if let Some(sid) = lookup("PARLEY_TWILIO_ACCOUNT_SID") {
        config.provider.account_sid = sid;
    }
    if let Some(token) = lookup("PARLEY_TWILIO_AUTH_TOKEN") {
        config.provider.auth_token = Secret::new(token);
    }
    if let Some(from) = lookup("PARLEY_FROM_NUMBER") {
        config.provider.from_number = from;
    }
    if let Some(url) = lookup("PARLEY_DATABASE_URL") {
        config.history.database_url = url;
    }
    if let Some(table) = lookup("PARLEY_TABLE") {
        config.history.table = table;
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> Result<ParleyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
