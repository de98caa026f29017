use {anyhow::Result, clap::Subcommand};

use parley_config::{ParleyConfig, Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the loaded configuration and report errors/warnings.
    Check,
    /// Print the user-global config directory.
    Path,
}

pub fn handle_config(action: ConfigAction, config: &ParleyConfig) -> Result<()> {
    match action {
        ConfigAction::Check => check(config),
        ConfigAction::Path => {
            match parley_config::config_dir() {
                Some(dir) => println!("{}", dir.display()),
                None => eprintln!("No home directory; only ./parley.* is searched."),
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &ParleyConfig) -> Result<()> {
    let result = parley_config::validate(config);

    for d in &result.diagnostics {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
