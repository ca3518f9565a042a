/// CLI configuration
use anyhow::{bail, Result};
use collector_core::types::CollectionKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendSettings,

    #[serde(default = "default_catalog")]
    pub catalog: CatalogSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    /// Base URL of the Playlist Collector backend. The default only makes
    /// sense for local development; deployments must set it explicitly.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    #[serde(default)]
    pub kind: CollectionKind,

    /// Fetch every collection's tracks as soon as the list loads. Costs
    /// request volume, makes expansion instant.
    #[serde(default = "default_prefetch_tracks")]
    pub prefetch_tracks: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,

    /// Directory where login completion records are exchanged
    #[serde(default = "default_signal_dir")]
    pub signal_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from config file if it exists
        let config_path = PathBuf::from("config.toml");
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        }

        // Override with environment variables (prefixed with COLLECTOR_,
        // e.g. COLLECTOR_BACKEND__API_URL)
        settings = settings.add_source(
            config::Environment::with_prefix("COLLECTOR")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.api_url.is_empty() {
            bail!("Backend URL is required (set COLLECTOR_BACKEND__API_URL)");
        }
        Ok(())
    }
}

// Default values
fn default_backend() -> BackendSettings {
    BackendSettings {
        api_url: default_api_url(),
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_catalog() -> CatalogSettings {
    CatalogSettings {
        kind: CollectionKind::default(),
        prefetch_tracks: default_prefetch_tracks(),
    }
}

fn default_prefetch_tracks() -> bool {
    true
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        token_path: default_token_path(),
        signal_dir: default_signal_dir(),
        output_dir: default_output_dir(),
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from("./data/token")
}

fn default_signal_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            catalog: default_catalog(),
            storage: default_storage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local() {
        let config = AppConfig::default();
        assert_eq!(config.backend.api_url, "http://127.0.0.1:3001");
        assert_eq!(config.catalog.kind, CollectionKind::Playlists);
        assert!(config.catalog.prefetch_tracks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_backend_url_is_rejected() {
        let mut config = AppConfig::default();
        config.backend.api_url = String::new();
        assert!(config.validate().is_err());
    }
}
