//! On-disk configuration.
//!
//! Loaded from `XDG_CONFIG_HOME/medley/config.toml`; every field has a
//! default so a missing file is not an error. `MEDLEY_SERVER` overrides
//! the configured server URL for quick testing against another host.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};

fn default_server_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_long_press_ms() -> u64 {
    500
}

fn default_move_threshold_px() -> f64 {
    10.0
}

fn default_double_tap_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedleyConfig {
    /// Base URL of the gallery server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Hold duration before a press becomes a long-press.
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,

    /// Pointer travel that cancels a pending long-press.
    #[serde(default = "default_move_threshold_px")]
    pub move_threshold_px: f64,

    /// Window for recognizing a double-tap.
    #[serde(default = "default_double_tap_ms")]
    pub double_tap_ms: u64,

    /// Running as an installed standalone shell: escape at the root may
    /// request app close.
    #[serde(default)]
    pub standalone: bool,
}

impl Default for MedleyConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            long_press_ms: default_long_press_ms(),
            move_threshold_px: default_move_threshold_px(),
            double_tap_ms: default_double_tap_ms(),
            standalone: false,
        }
    }
}

impl MedleyConfig {
    /// Load from the default XDG location, falling back to defaults
    /// when no file exists.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_config_path()?;
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            debug!(?path, "no config file, using defaults");
            Self::default()
        };
        if let Ok(server) = std::env::var("MEDLEY_SERVER") {
            info!(%server, "server URL overridden from environment");
            config.server_url = server;
        }
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "medley")
            .context("Failed to determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {:?}", path))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.double_tap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: MedleyConfig = toml::from_str("server_url = \"http://gallery:9000\"").unwrap();
        assert_eq!(config.server_url, "http://gallery:9000");
        assert_eq!(config.long_press_ms, 500);
        assert_eq!(config.double_tap_ms, 300);
        assert!(!config.standalone);
    }

    #[test]
    fn load_reads_a_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_url = \"http://srv\"\nlong_press_ms = 350\nstandalone = true"
        )
        .unwrap();
        let config = MedleyConfig::load(file.path()).unwrap();
        assert_eq!(config.server_url, "http://srv");
        assert_eq!(config.long_press(), Duration::from_millis(350));
        assert!(config.standalone);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url = [not valid").unwrap();
        assert!(MedleyConfig::load(file.path()).is_err());
    }
}
