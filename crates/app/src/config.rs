//! Service configuration
//!
//! Loaded from a TOML file when one exists; every field has a default so
//! a bare `banquet-app` starts with a data directory under the platform
//! config path and an hourly sweep.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database path; defaults to `<data dir>/banquet.db`
    pub database_path: Option<PathBuf>,
    /// Seconds between expiry sweep cycles
    pub sweep_interval_secs: u64,
    /// Base directory for uploaded event media
    pub media_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            sweep_interval_secs: 3600,
            media_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist
    pub fn load_default() -> Self {
        match Self::default_config_path() {
            Some(path) if path.exists() => match Self::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "banquet", "banquet")
            .map(|dirs| dirs.config_dir().join("banquet.toml"))
    }

    /// Resolve the database path, creating parent directories as needed
    pub fn resolve_database_path(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = match &self.database_path {
            Some(path) => path.clone(),
            None => {
                let dirs = ProjectDirs::from("dev", "banquet", "banquet")
                    .ok_or("could not determine data directory")?;
                dirs.data_dir().join("banquet.db")
            }
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sweep_interval_secs, 3600);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banquet.toml");
        std::fs::write(
            &path,
            r#"
                database_path = "/tmp/banquet-test.db"
                sweep_interval_secs = 60
            "#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/tmp/banquet-test.db"))
        );
        // Unset fields keep their defaults
        assert!(config.media_dir.is_none());
    }
}
