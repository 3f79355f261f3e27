//! Configuration loading for Tuneline services
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`ENABLE_CACHE`, `CACHE_PLAYLISTS`, `TUNELINE_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! A missing default config file is not an error: the service logs a warning
//! and starts with defaults. A config file named explicitly must exist.

use crate::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TUNELINE_CONFIG";

/// Default read size for streamed audio downloads (128 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 131_072;

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process map, lost on restart
    #[default]
    Memory,
    /// SQLite key/blob table
    Sqlite,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CacheConfig {
    /// Cache individual track records
    #[serde(default)]
    pub enabled: bool,

    /// Also cache whole resolved playlists under the playlist URL
    #[serde(default)]
    pub cache_playlists: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    /// SQLite file for the `sqlite` backend (defaults under the data dir)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl CacheConfig {
    /// Resolve the SQLite cache path, falling back to the platform data dir
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("tuneline").join("cache.db"))
                .unwrap_or_else(|| PathBuf::from("./tuneline_data/cache.db"))
        })
    }
}

/// How extractors treat an embedded image that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidArtPolicy {
    /// Keep the text tags, report no album art
    #[default]
    Drop,
    /// Report the tag as not yet complete and keep streaming
    Wait,
}

/// Remote fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Bytes per streamed chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Maximum wait for any single body read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Tracks resolved concurrently per playlist (1 = strictly sequential)
    #[serde(default = "default_max_concurrent_tracks")]
    pub max_concurrent_tracks: usize,

    #[serde(default)]
    pub invalid_art: InvalidArtPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            max_concurrent_tracks: default_max_concurrent_tracks(),
            invalid_art: InvalidArtPolicy::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5731
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_tracks() -> usize {
    1
}

impl TomlConfig {
    /// Load configuration from an explicit path, `TUNELINE_CONFIG`, or the
    /// platform default location, then apply environment overrides
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let explicit = explicit_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    warn!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Apply environment variable overrides on top of file values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("ENABLE_CACHE") {
            self.cache.enabled = is_truthy(&value);
        }
        if let Ok(value) = std::env::var("CACHE_PLAYLISTS") {
            self.cache.cache_playlists = is_truthy(&value);
        }
        if let Ok(value) = std::env::var("TUNELINE_PORT") {
            self.port = value
                .parse()
                .map_err(|e| Error::Config(format!("Invalid TUNELINE_PORT '{}': {}", value, e)))?;
        }
        if let Ok(value) = std::env::var("TUNELINE_CHUNK_SIZE") {
            self.fetch.chunk_size = value.parse().map_err(|e| {
                Error::Config(format!("Invalid TUNELINE_CHUNK_SIZE '{}': {}", value, e))
            })?;
        }
        if let Ok(value) = std::env::var("TUNELINE_CACHE_DB") {
            self.cache.database_path = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Listening address from `bind_address` and `port`
    ///
    /// Accepts IPv4 and IPv6 literals; an IPv6 address may be bracketed.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let host = self.bind_address.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let ip: IpAddr = host.parse().map_err(|e| {
            Error::Config(format!("Invalid bind_address '{}': {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Reject values the resolver cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.fetch.chunk_size == 0 {
            return Err(Error::Config("fetch.chunk_size must be greater than 0".to_string()));
        }
        if self.fetch.max_concurrent_tracks == 0 {
            return Err(Error::Config(
                "fetch.max_concurrent_tracks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform default config file: `<config_dir>/tuneline/tuneline.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tuneline").join("tuneline.toml"))
}

/// Interpret a feature-flag environment value
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "True" | "true" | "TRUE" | "1" | "yes")
}
