use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RegistryConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Save the whole database after every register/delete instead of only at shutdown.
    #[serde(default)]
    pub flush_on_write: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    "database.json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            flush_on_write: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Where a loaded config came from. Loading happens before logging is set up,
/// so the outcome is kept and reported afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File,
    /// File was missing; defaults written in its place.
    Created,
    /// File was missing and the defaults could not be written.
    CreateFailed(String),
    /// File exists but could not be read or parsed; defaults used.
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RegistryConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    /// Log how the config at `path` was obtained.
    pub fn report(&self, path: &str) {
        match &self.source {
            ConfigSource::File => info!("Config loaded from {}", path),
            ConfigSource::Created => {
                info!("Config file not found at '{}'. Created default.", path)
            }
            ConfigSource::CreateFailed(e) => {
                warn!("Config file not found at '{}' and could not be created: {}", path, e)
            }
            ConfigSource::Invalid(e) => {
                error!("Error loading config '{}': {}. Using defaults.", path, e)
            }
        }
    }
}

impl RegistryConfig {
    /// Load the config at `path`. A missing file is created with the defaults;
    /// an unreadable or invalid one falls back to the defaults. Nothing is
    /// logged here, see [`LoadedConfig::report`].
    pub fn load_or_default(path: &str) -> LoadedConfig {
        if std::path::Path::new(path).exists() {
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| format!("read failed: {}", e))
                .and_then(|s| toml::from_str::<RegistryConfig>(&s).map_err(|e| format!("parse failed: {}", e)));
            match parsed {
                Ok(config) => LoadedConfig { config, source: ConfigSource::File },
                Err(e) => LoadedConfig {
                    config: Self::default(),
                    source: ConfigSource::Invalid(e),
                },
            }
        } else {
            let config = Self::default();
            let written = toml::to_string_pretty(&config)
                .map_err(|e| e.to_string())
                .and_then(|s| std::fs::write(path, s).map_err(|e| e.to_string()));
            let source = match written {
                Ok(()) => ConfigSource::Created,
                Err(e) => ConfigSource::CreateFailed(e),
            };
            LoadedConfig { config, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        let path = path.to_str().unwrap();

        let loaded = RegistryConfig::load_or_default(path);
        assert_eq!(loaded.source, ConfigSource::Created);
        let config = loaded.config;
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.database_path, "database.json");

        let written: RegistryConfig =
            toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[storage]\nflush_on_write = true\n").unwrap();

        let loaded = RegistryConfig::load_or_default(path.to_str().unwrap());
        assert_eq!(loaded.source, ConfigSource::File);
        let config = loaded.config;
        assert!(config.storage.flush_on_write);
        assert_eq!(config.storage.database_path, "database.json");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        let loaded = RegistryConfig::load_or_default(path.to_str().unwrap());
        assert_eq!(loaded.config, RegistryConfig::default());
        match &loaded.source {
            ConfigSource::Invalid(e) => assert!(e.contains("parse failed"), "{}", e),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_unwritable_default_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("registry.toml");

        let loaded = RegistryConfig::load_or_default(path.to_str().unwrap());
        assert_eq!(loaded.config, RegistryConfig::default());
        assert!(matches!(loaded.source, ConfigSource::CreateFailed(_)));
    }
}
