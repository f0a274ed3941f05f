use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::storage::{atomic_write, restrict_dir, restrict_file};

pub const APP_DIR: &str = ".securevault";
pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where the vault keeps its data files. Relative paths are taken from
    /// the home directory.
    pub vault_dir: Option<String>,
    pub log_level: String,
    pub clipboard_clear_secs: u64,
    /// Delay between import progress lines in the UI.
    pub import_reveal_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            clipboard_clear_secs: 20,
            import_reveal_ms: 450,
        }
    }
}

pub fn default_base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(default_base_dir()?.join(CONFIG_FILE))
}

pub fn load_config() -> Result<Config> {
    load_or_init_config(&config_path()?)
}

/// Like [`load_config_from`], but a missing file is created with the
/// defaults so there is something to edit.
pub fn load_or_init_config(path: &Path) -> Result<Config> {
    let cfg = load_config_from(path)?;
    if !path.exists() {
        save_config_to(path, &cfg)?;
    }
    Ok(cfg)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)?;
    let cfg: Config = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("Invalid config at {}: {e}", path.display()))?;
    Ok(cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            restrict_dir(parent)?;
        }
    }
    let data = serde_json::to_string_pretty(cfg)?;
    atomic_write(path, data.as_bytes())?;
    restrict_file(path)?;
    Ok(())
}

impl Config {
    /// Resolves the directory holding vault data, refusing anything outside
    /// the home directory.
    pub fn vault_dir(&self) -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
        match &self.vault_dir {
            Some(raw) => resolve_vault_dir_under_home(Path::new(raw), &home),
            None => Ok(home.join(APP_DIR)),
        }
    }
}

pub fn resolve_vault_dir_under_home(raw: &Path, home: &Path) -> Result<PathBuf> {
    let candidate = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        home.join(raw)
    };

    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(anyhow!("Path cannot contain '..' traversal components"));
    }
    if !candidate.starts_with(home) {
        return Err(anyhow!("Path must be inside {}", home.display()));
    }

    // Resolve symlinks when possible to prevent escaping home via symlink targets.
    let home_real = fs::canonicalize(home).unwrap_or_else(|_| home.to_path_buf());
    if candidate.exists() {
        let candidate_real = fs::canonicalize(&candidate)?;
        if !candidate_real.starts_with(&home_real) {
            return Err(anyhow!("Path resolves outside {}", home.display()));
        }
    } else if let Some(parent) = candidate.parent() {
        if parent.exists() {
            let parent_real = fs::canonicalize(parent)?;
            if !parent_real.starts_with(&home_real) {
                return Err(anyhow!("Path parent resolves outside {}", home.display()));
            }
        }
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"log_level":"debug"}"#).unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.clipboard_clear_secs, 20);
        assert!(cfg.vault_dir.is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = Config {
            vault_dir: Some("vaults/main".into()),
            ..Config::default()
        };
        save_config_to(&path, &cfg).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn first_load_writes_the_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_DIR).join(CONFIG_FILE);
        let cfg = load_or_init_config(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        fs::write(&path, r#"{"clipboard_clear_secs":5}"#).unwrap();
        let edited = load_or_init_config(&path).unwrap();
        assert_eq!(edited.clipboard_clear_secs, 5);
    }

    #[test]
    fn vault_dir_must_stay_under_home() {
        let home = tempfile::tempdir().unwrap();
        let ok = resolve_vault_dir_under_home(Path::new("data"), home.path()).unwrap();
        assert_eq!(ok, home.path().join("data"));
        assert!(resolve_vault_dir_under_home(Path::new("../elsewhere"), home.path()).is_err());
        assert!(resolve_vault_dir_under_home(Path::new("/definitely/not/home"), home.path()).is_err());
    }
}
