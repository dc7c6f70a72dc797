use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use crate::core::RadiusUnit;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    /// Keep everything in process memory instead of PostgreSQL
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Unit match distances are stored in ("km" or "m")
    #[serde(default)]
    pub distance_unit: RadiusUnit,
    /// Threshold applied when a caller asks for filtered matches without one
    pub default_max_distance: Option<f64>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            distance_unit: RadiusUnit::Kilometers,
            default_max_distance: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with EXCHANGE__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., EXCHANGE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("EXCHANGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }
}

/// Apply the conventional DATABASE_URL override
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return Ok(settings);
    };

    Config::builder()
        .add_source(settings)
        .set_override("database.url", database_url)?
        .build()
}
