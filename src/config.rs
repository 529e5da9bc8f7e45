//! TOML settings for the remote source and logging.
//!
//! Loading order:
//! - `--config <FILE>` or `$ARTPICK_CONFIG`
//! - `<config dir>/artpick/config.toml` if it exists
//! - built-in defaults (mirrored in `config/default.toml`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable read by `--config` when the flag is absent.
pub const CONFIG_ENV: &str = "ARTPICK_CONFIG";

pub const DEFAULT_BASE_URL: &str = "https://api.artic.edu/api/v1/artworks";
pub const DEFAULT_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Collection endpoint; the page index is sent as `?page=P`.
    pub base_url: String,
    /// Records per page. Must match what the server returns.
    pub page_size: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
            user_agent: "artpick/0.1".to_string(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `explicit` if given, else from the platform config
    /// dir if a file exists there, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).or_else(Self::locate);
        match path {
            Some(path) => Self::from_path(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a TOML file at the given path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.api.page_size == 0 {
            bail!("api.page_size must be at least 1");
        }
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url cannot be empty");
        }
        Ok(())
    }

    fn locate() -> Option<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("artpick").join("config.toml"))
            .filter(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_shipped_default_file_matches_builtin_defaults() {
        let shipped = include_str!("../config/default.toml");
        let settings = Settings::from_toml(shipped).expect("shipped defaults must parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let settings = Settings::from_toml("[api]\npage_size = 25\n").unwrap();
        assert_eq!(settings.api.page_size, 25);
        assert_eq!(settings.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Settings::from_toml("[api]\npage_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("page_size"), "unexpected error: {}", err);
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api]\ntimeout_secs = 5\n\n[log]\nfilter = \"debug\"").unwrap();

        let settings = Settings::from_path(file.path()).unwrap();
        assert_eq!(settings.api.timeout(), Duration::from_secs(5));
        assert_eq!(settings.log.filter, "debug");
    }

    #[test]
    fn test_load_prefers_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[api]\npage_size = 7").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api.page_size, 7);
    }

    #[test]
    fn test_from_path_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::from_path(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }
}
