use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::selector::{Backend, BackendSelection, FAMILIES};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Service base URL (e.g., "https://habits.example.com/api")
    pub base_url: Option<String>,
    /// User every request is scoped to
    pub user: Option<String>,
}

impl RemoteConfig {
    /// Returns true if both base_url and user are set
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.user.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub remote: RemoteConfig,
    /// Which store backs each entity family
    pub backends: BackendSelection,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    remote: Option<RemoteConfig>,
    backends: Option<BackendsFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BackendsFile {
    habits: Option<Backend>,
    events: Option<Backend>,
    categories: Option<Backend>,
    rules: Option<Backend>,
    logs: Option<Backend>,
}

impl BackendsFile {
    fn apply_to(self, selection: &mut BackendSelection) {
        let entries = [
            ("habits", self.habits),
            ("events", self.events),
            ("categories", self.categories),
            ("rules", self.rules),
            ("logs", self.logs),
        ];
        for (family, backend) in entries {
            if let Some(backend) = backend {
                selection.set(family, backend);
            }
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("habits.db");

        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut config_file = None;
        let mut remote = RemoteConfig::default();
        let mut backends = BackendSelection::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(file_backends) = file_config.backends {
                file_backends.apply_to(&mut backends);
            }
        }

        if let Ok(db_path) = std::env::var("HABITS_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("HABITS_REMOTE_URL") {
            remote.base_url = Some(url);
        }
        if let Ok(user) = std::env::var("HABITS_REMOTE_USER") {
            remote.user = Some(user);
        }
        for family in FAMILIES {
            let var = format!("HABITS_BACKEND_{}", family.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                let backend = value
                    .parse()
                    .map_err(|_| ConfigError::InvalidBackend(format!("{}={}", var, value)))?;
                backends.set(family, backend);
            }
        }

        if !remote.is_configured() {
            if let Some(family) = backends.first_remote() {
                return Err(ConfigError::RemoteNotConfigured(family));
            }
        }

        Ok(Self {
            database_path,
            config_file,
            remote,
            backends,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/habits/
    /// - macOS: ~/Library/Application Support/habits/
    /// - Windows: %APPDATA%/habits/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habits")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/habits/
    /// - macOS: ~/Library/Application Support/habits/
    /// - Windows: %APPDATA%/habits/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("habits")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidBackend(String),
    RemoteNotConfigured(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidBackend(value) => {
                write!(f, "Invalid backend '{}'. Valid options: local, remote", value)
            }
            ConfigError::RemoteNotConfigured(family) => {
                write!(
                    f,
                    "Backend for {} is remote but remote.base_url and remote.user are not both set",
                    family
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(lines: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        (temp_dir, config_path)
    }

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("habits.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
        assert!(!config.remote.is_configured());
        assert_eq!(config.backends, BackendSelection::default());
    }

    #[test]
    fn test_load_from_file() {
        let (_dir, config_path) = write_config(&[
            "database_path: /custom/path/habits.sqlite",
            "remote:",
            "  base_url: https://habits.example.com",
            "  user: alice",
            "backends:",
            "  habits: remote",
            "  logs: remote",
        ]);

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/habits.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
        assert_eq!(config.remote.user.as_deref(), Some("alice"));
        assert_eq!(config.backends.habits, Backend::Remote);
        assert_eq!(config.backends.logs, Backend::Remote);
        assert_eq!(config.backends.events, Backend::Local);
    }

    #[test]
    fn test_relative_database_path_resolves_against_file() {
        let (dir, config_path) = write_config(&["database_path: data/habits.db"]);

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.value, dir.path().join("data/habits.db"));
    }

    #[test]
    fn test_remote_backend_without_remote_settings_fails() {
        let (_dir, config_path) = write_config(&["backends:", "  rules: remote"]);

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(matches!(err, ConfigError::RemoteNotConfigured("rules")));
    }

    #[test]
    fn test_unknown_backend_in_file_is_parse_error() {
        let (_dir, config_path) = write_config(&["backends:", "  habits: cloud"]);

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let (_dir, config_path) = write_config(&["database_path: /from/file.db"]);

        std::env::set_var("HABITS_DATABASE_PATH", "/from/env.db");
        std::env::set_var("HABITS_REMOTE_URL", "http://localhost:8000");
        std::env::set_var("HABITS_REMOTE_USER", "bob");
        std::env::set_var("HABITS_BACKEND_HABITS", "remote");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.database_path.value, PathBuf::from("/from/env.db"));
        assert_eq!(config.database_path.source, ConfigSource::Environment);
        assert_eq!(config.backends.habits, Backend::Remote);

        std::env::remove_var("HABITS_DATABASE_PATH");
        std::env::remove_var("HABITS_REMOTE_URL");
        std::env::remove_var("HABITS_REMOTE_USER");
        std::env::remove_var("HABITS_BACKEND_HABITS");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let (_dir, config_path) = write_config(&["invalid: yaml: content: ["]);

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
