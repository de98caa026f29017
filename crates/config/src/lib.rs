//! Configuration loading, validation, and env substitution.
//!
//! Config files: `parley.toml`, `parley.yaml`, or `parley.json`
//! Searched in `./` then `~/.config/parley/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and a handful of
//! `PARLEY_*` environment overrides for credentials.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        HistoryConfig, MetricsConfig, ParleyConfig, ProviderConfig, ProviderKind, ReplyConfig,
        ServerConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, is_sql_identifier, validate},
};
