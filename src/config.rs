use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

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

/// Remote store implementation backing the sync layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Local SQLite file standing in for the remote tables
    #[default]
    Sqlite,
    /// PostgREST-style HTTP API
    Rest,
    /// In-process tables, discarded on exit
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Rest => write!(f, "rest"),
            Backend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "rest" => Ok(Backend::Rest),
            "memory" => Ok(Backend::Memory),
            _ => Err(format!(
                "Invalid backend '{}'. Valid options: sqlite, rest, memory",
                s
            )),
        }
    }
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Base URL of the REST API (e.g., "https://project.example.com")
    pub url: Option<String>,
    /// API key, also used as the access token when no user token is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Token of a signed-in user; requests run as that user when set
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl RemoteConfig {
    /// Returns true if both url and api_key are set
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub backend: ConfigValue<Backend>,
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    backend: Option<Backend>,
    database_path: Option<PathBuf>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut backend = ConfigValue::new(Backend::default(), ConfigSource::Default);
        let mut database_path = ConfigValue::new(
            Self::default_data_dir().join("classplan.db"),
            ConfigSource::Default,
        );
        let mut config_file = None;
        let mut remote = RemoteConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(kind) = file_config.backend {
                backend = ConfigValue::new(kind, ConfigSource::File);
            }
            if let Some(db_path) = file_config.database_path {
                // Relative paths are relative to the config file
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
        }

        if let Ok(value) = std::env::var("CLASSPLAN_BACKEND") {
            let kind = value
                .parse()
                .map_err(|e| ConfigError::InvalidValue("CLASSPLAN_BACKEND".to_string(), e))?;
            backend = ConfigValue::new(kind, ConfigSource::Environment);
        }
        if let Ok(db_path) = std::env::var("CLASSPLAN_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("CLASSPLAN_REMOTE_URL") {
            remote.url = Some(url);
        }
        if let Ok(key) = std::env::var("CLASSPLAN_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Ok(token) = std::env::var("CLASSPLAN_ACCESS_TOKEN") {
            remote.access_token = Some(token);
        }

        Ok(Self {
            backend,
            database_path,
            config_file,
            remote,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/classplan/
    /// - macOS: ~/Library/Application Support/classplan/
    /// - Windows: %APPDATA%/classplan/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("classplan")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/classplan/
    /// - macOS: ~/Library/Application Support/classplan/
    /// - Windows: %APPDATA%/classplan/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("classplan")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Starter config file written by `config init`.
    pub fn template() -> &'static str {
        "# classplan configuration\n\
         # backend: sqlite | rest | memory\n\
         backend: sqlite\n\
         # database_path: classplan.db\n\
         # remote:\n\
         #   url: https://project.example.com\n\
         #   api_key: your-api-key\n\
         #   access_token: user-session-token\n"
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
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
            ConfigError::InvalidValue(key, e) => write!(f, "Invalid {}: {}", key, e),
        }
    }
}

impl std::error::Error for ConfigError {}
