use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Local fallback storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the JSON-lines streams and stats file (default: "./logs")
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

/// Google Cloud Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrimaryConfig {
    /// Attempt the primary backend before local storage (default: true)
    #[serde(default = "default_primary_enabled")]
    pub enabled: bool,

    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default = "default_log_name")]
    pub log_name: String,

    #[serde(default = "default_primary_base_url")]
    pub base_url: String,

    /// OAuth2 access token. Empty means the primary backend is skipped.
    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_primary_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_primary_enabled(),
            project_id: default_project_id(),
            log_name: default_log_name(),
            base_url: default_primary_base_url(),
            access_token: String::new(),
            timeout_seconds: default_primary_timeout(),
        }
    }
}

impl PrimaryConfig {
    /// Enabled and carrying credentials
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.access_token.is_empty()
    }
}

/// Fixed-window admission control on the log endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Requests allowed per client per window (default: 100)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_primary_enabled() -> bool {
    true
}

fn default_project_id() -> String {
    "visa-rules-project".to_string()
}

fn default_log_name() -> String {
    "visa-checker-logs".to_string()
}

fn default_primary_base_url() -> String {
    "https://logging.googleapis.com".to_string()
}

fn default_primary_timeout() -> u64 {
    10
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_seconds() -> u64 {
    15 * 60
}

/// Load configuration from an optional file layered with `VISA_LOGS__*`
/// environment variables (e.g. `VISA_LOGS__PRIMARY__ACCESS_TOKEN`).
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("VISA_LOGS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port must be non-zero");
    }

    match cfg.server.log_format.as_str() {
        "pretty" | "json" => {}
        other => anyhow::bail!("Invalid log format '{}': expected 'pretty' or 'json'", other),
    }

    if cfg.storage.log_dir.trim().is_empty() {
        anyhow::bail!("Storage log_dir cannot be empty");
    }

    if cfg.primary.enabled {
        if cfg.primary.project_id.is_empty() {
            anyhow::bail!("Primary backend is enabled but project_id is empty");
        }
        if cfg.primary.log_name.is_empty() {
            anyhow::bail!("Primary backend is enabled but log_name is empty");
        }
        if cfg.primary.timeout_seconds == 0 {
            anyhow::bail!("Primary backend timeout_seconds must be non-zero");
        }
    }

    if cfg.rate_limit.enabled {
        if cfg.rate_limit.max_requests == 0 {
            anyhow::bail!("Rate limit max_requests must be non-zero");
        }
        if cfg.rate_limit.window_seconds == 0 {
            anyhow::bail!("Rate limit window_seconds must be non-zero");
        }
    }

    Ok(())
}
