//! Server configuration, read from a TOML file.

use carta_object::{DEFAULT_ROOT, RegistryConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

fn default_log_level() -> String {
    "info".to_string()
}

fn default_object_root() -> String {
    DEFAULT_ROOT.to_string()
}

fn default_event_queue_capacity() -> usize {
    256
}

fn default_update_buffer() -> usize {
    1024
}

/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Directories plugins are discovered in. Discovery itself happens
    /// outside the server; the list is passed along for logging.
    #[serde(default, rename = "plugin-directories")]
    pub plugin_directories: Vec<PathBuf>,
    #[serde(default, rename = "developer-layout")]
    pub developer_layout: bool,
    #[serde(default, rename = "hacks-enabled")]
    pub hacks_enabled: bool,
    #[serde(default = "default_log_level", rename = "log-level")]
    pub log_level: String,
    #[serde(default = "default_object_root", rename = "object-root")]
    pub object_root: String,
    #[serde(default = "default_event_queue_capacity", rename = "event-queue-capacity")]
    pub event_queue_capacity: usize,
    /// State updates a slow client may fall behind before it misses some.
    #[serde(default = "default_update_buffer", rename = "update-buffer")]
    pub update_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            plugin_directories: Vec::new(),
            developer_layout: false,
            hacks_enabled: false,
            log_level: default_log_level(),
            object_root: default_object_root(),
            event_queue_capacity: default_event_queue_capacity(),
            update_buffer: default_update_buffer(),
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the path; defaults apply.
    Missing(PathBuf),
    /// The file could not be read or parsed; defaults apply.
    Invalid { path: PathBuf, reason: String },
}

impl ConfigSource {
    /// Logs how the configuration was obtained. Called once logging is up,
    /// since the log level itself comes from the configuration.
    pub fn log(&self) {
        match self {
            Self::File(path) => info!("Loaded configuration from {:?}", path),
            Self::Missing(path) => info!("No configuration file at {:?}, using defaults", path),
            Self::Invalid { path, reason } => warn!(
                "Failed to load configuration {:?}: {}. Falling back to defaults.",
                path, reason
            ),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration at `path`, falling back to defaults when the
    /// file is missing or malformed.
    pub fn load_from(path: &Path) -> (Self, ConfigSource) {
        if !path.exists() {
            return (Self::default(), ConfigSource::Missing(path.to_path_buf()));
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|contents| toml::from_str::<Self>(&contents).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
            Err(reason) => (
                Self::default(),
                ConfigSource::Invalid {
                    path: path.to_path_buf(),
                    reason,
                },
            ),
        }
    }

    /// Configured log level; unrecognized names mean `INFO`.
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            root: self.object_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn load_str(contents: &str) -> (ServerConfig, ConfigSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carta.toml");
        std::fs::write(&path, contents).unwrap();
        ServerConfig::load_from(&path)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let (config, source) = ServerConfig::load_from(&path);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(source, ConfigSource::Missing(path));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let (config, source) = load_str("");
        assert_eq!(config, ServerConfig::default());
        assert!(matches!(source, ConfigSource::File(_)));
        assert_eq!(config.registry_config(), RegistryConfig::default());
    }

    #[test]
    fn fields_override_defaults() {
        let (config, _) = load_str(
            r#"
plugin-directories = ["/opt/carta/plugins", "plugins"]
developer-layout = true
log-level = "debug"
object-root = "/Session"
event-queue-capacity = 8
"#,
        );
        assert_eq!(config.plugin_directories.len(), 2);
        assert!(config.developer_layout);
        assert!(!config.hacks_enabled);
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.registry_config().root, "/Session");
        assert_eq!(config.event_queue_capacity, 8);
        assert_eq!(config.update_buffer, 1024);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let (config, source) = load_str("log-level = [");
        assert_eq!(config, ServerConfig::default());
        assert!(matches!(source, ConfigSource::Invalid { .. }));
    }

    #[test]
    fn wrong_field_type_is_invalid() {
        let (_, source) = load_str("event-queue-capacity = \"many\"");
        assert!(matches!(source, ConfigSource::Invalid { reason, .. } if reason.contains("event-queue-capacity")));
    }

    #[test]
    fn unknown_level_means_info() {
        let config = ServerConfig {
            log_level: "chatty".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.level(), Level::INFO);
    }
}
