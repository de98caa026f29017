//! Semantic configuration checks.
//!
//! Parsing already enforces types; this catches values that parse fine but
//! would make the reply pipeline misbehave.

use crate::{
    error::{Error, Result},
    schema::ParleyConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "reply.max_chunk_len"
    pub path: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Turn error diagnostics into an [`Error::Invalid`].
    pub fn into_result(self) -> Result<Vec<Diagnostic>> {
        if !self.has_errors() {
            return Ok(self.diagnostics);
        }
        let message = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::Invalid { message })
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check a loaded config for values the pipeline cannot work with.
#[must_use]
pub fn validate(config: &ParleyConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.reply.max_chunk_len == 0 {
        result.push(
            Severity::Error,
            "reply.max_chunk_len",
            "must be greater than zero",
        );
    }
    if config.reply.max_poll_attempts == 0 {
        result.push(
            Severity::Error,
            "reply.max_poll_attempts",
            "must be greater than zero",
        );
    }
    if config.reply.poll_interval_ms == 0 {
        result.push(
            Severity::Warning,
            "reply.poll_interval_ms",
            "zero interval polls the provider in a tight loop",
        );
    }
    if !is_sql_identifier(&config.history.table) {
        result.push(
            Severity::Error,
            "history.table",
            format!(
                "`{}` is not a valid table name (letters, digits, underscore)",
                config.history.table
            ),
        );
    }
    if !config.provider.is_configured() {
        result.push(
            Severity::Warning,
            "provider",
            "account_sid, auth_token and from_number are required to deliver replies",
        );
    }

    result
}

/// Plain identifier: ASCII letter or underscore, then letters, digits, underscores.
#[must_use]
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn configured() -> ParleyConfig {
        let mut cfg = ParleyConfig::default();
        cfg.provider.account_sid = "AC1".into();
        cfg.provider.auth_token = Secret::new("tok".into());
        cfg.provider.from_number = "+14155238886".into();
        cfg
    }

    #[test]
    fn defaults_with_credentials_are_clean() {
        let result = validate(&configured());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_credentials_warn() {
        let result = validate(&ParleyConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn zero_limits_are_errors() {
        let mut cfg = configured();
        cfg.reply.max_chunk_len = 0;
        cfg.reply.max_poll_attempts = 0;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);

        let err = result.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("reply.max_chunk_len"));
        assert!(msg.contains("reply.max_poll_attempts"));
    }

    #[test]
    fn table_name_must_be_identifier() {
        let mut cfg = configured();
        cfg.history.table = "interactions; DROP TABLE x".into();
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn identifier_rules() {
        assert!(is_sql_identifier("interactions"));
        assert!(is_sql_identifier("_wa_2024"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("2024_wa"));
        assert!(!is_sql_identifier("wa-interactions"));
    }
}
