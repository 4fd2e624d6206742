use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::EngineOptions;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Which building store backs the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Rest,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
    /// JSON array of building rows; the memory store's data and the local fallback
    pub snapshot_path: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            url: None,
            api_key: None,
            timeout_secs: default_store_timeout(),
            snapshot_path: None,
        }
    }
}

fn default_store_timeout() -> u64 { 30 }

/// History database. History endpoints answer 503 when no URL is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    /// Zero disables caching
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_l1_cache_size")]
    pub l1_cache_size: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            l1_cache_size: default_l1_cache_size(),
        }
    }
}

fn default_cache_ttl() -> u64 { 300 }
fn default_l1_cache_size() -> u64 { 1000 }

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Radius used when a request carries a location but no radius
    #[serde(default = "default_radius_km")]
    pub default_radius_km: u32,
    #[serde(default = "default_primary_timeout")]
    pub primary_timeout_secs: u64,
    /// Re-check fallback hits against the true radius
    #[serde(default = "default_strict_radius")]
    pub strict_radius: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_radius_km: default_radius_km(),
            primary_timeout_secs: default_primary_timeout(),
            strict_radius: default_strict_radius(),
        }
    }
}

impl SearchSettings {
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            page_size: self.page_size,
            primary_timeout: Duration::from_secs(self.primary_timeout_secs),
            strict_radius: self.strict_radius,
        }
    }
}

fn default_page_size() -> usize { 20 }
fn default_radius_km() -> u32 { 5 }
fn default_primary_timeout() -> u64 { 30 }
fn default_strict_radius() -> bool { true }

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
    /// 4. Environment variables (prefixed with ARCHI__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ARCHI__SEARCH__PAGE_SIZE -> search.page_size
            .add_source(
                Environment::with_prefix("ARCHI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ARCHI")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional unprefixed variables (`DATABASE_URL`, `REDIS_URL`)
/// when the prefixed ones are not set
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if env::var("ARCHI__DATABASE__URL").is_err() {
        if let Ok(url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
    }
    if env::var("ARCHI__CACHE__REDIS_URL").is_err() {
        if let Ok(url) = env::var("REDIS_URL") {
            builder = builder.set_override("cache.redis_url", url)?;
        }
    }

    builder.build()
}
