use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::debug;

use crate::storage::restrict_file;

pub const LOG_ENV: &str = "SECUREVAULT_LOG";
pub const LOG_FILE: &str = "securevault.log";

/// Sends `tracing` output to a log file in the vault directory; the terminal
/// belongs to the UI. `SECUREVAULT_LOG` overrides the configured level.
pub fn init_logging(vault_dir: &Path, log_level: &str) -> Result<PathBuf> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("securevault={log_level},warn")));

    std::fs::create_dir_all(vault_dir)
        .with_context(|| format!("Failed to create {}", vault_dir.display()))?;
    let path = vault_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    restrict_file(&path)?;

    // try_init only fails when a global subscriber is already set; that one stays
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(false)
        .try_init()
    {
        debug!(error = %err, "log subscriber already installed, keeping it");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_working() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let path = init_logging(first.path(), "debug").unwrap();
        assert_eq!(path, first.path().join(LOG_FILE));
        let again = init_logging(second.path(), "info").unwrap();
        assert!(again.exists());
    }
}
