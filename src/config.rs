//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::credentials::FileCredentialStore;
use crate::dashboard::fallback::{DEFAULT_PRICE_BASKET, PLACEHOLDER_IMAGE_URL};
use crate::dashboard::DashboardSettings;
use crate::gateway::HttpGatewayConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_price_api_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            price_api_url: default_price_api_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Where the session token is persisted between runs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// Defaults to the platform data directory
    pub path: Option<String>,
}

impl CredentialsConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(FileCredentialStore::default_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_basket")]
    pub default_basket: Vec<String>,

    #[serde(default = "default_placeholder_image")]
    pub placeholder_image_url: String,
}

fn default_basket() -> Vec<String> {
    DEFAULT_PRICE_BASKET.iter().map(|id| id.to_string()).collect()
}

fn default_placeholder_image() -> String {
    PLACEHOLDER_IMAGE_URL.to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_basket: default_basket(),
            placeholder_image_url: default_placeholder_image(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("crypto-advisor").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Gateway overrides
        if let Some(url) = var("CRYPTO_ADVISOR_BACKEND_URL") {
            self.gateway.backend_url = url;
        }
        if let Some(url) = var("CRYPTO_ADVISOR_PRICE_API_URL") {
            self.gateway.price_api_url = url;
        }
        if let Some(timeout) = var("CRYPTO_ADVISOR_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.gateway.request_timeout_ms = ms;
            }
        }

        if let Some(path) = var("CRYPTO_ADVISOR_CREDENTIALS_PATH") {
            self.credentials.path = Some(path);
        }

        // Logging overrides
        if let Some(level) = var("CRYPTO_ADVISOR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CRYPTO_ADVISOR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn backend_gateway(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.gateway.backend_url.clone(),
            request_timeout_ms: self.gateway.request_timeout_ms,
            ..HttpGatewayConfig::default()
        }
    }

    pub fn price_gateway(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.gateway.price_api_url.clone(),
            request_timeout_ms: self.gateway.request_timeout_ms,
            ..HttpGatewayConfig::default()
        }
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            default_basket: self.dashboard.default_basket.clone(),
            placeholder_image_url: self.dashboard.placeholder_image_url.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Crypto Advisor Configuration
#
# Environment variables override these settings:
# - CRYPTO_ADVISOR_BACKEND_URL
# - CRYPTO_ADVISOR_PRICE_API_URL
# - CRYPTO_ADVISOR_REQUEST_TIMEOUT_MS
# - CRYPTO_ADVISOR_CREDENTIALS_PATH
# - CRYPTO_ADVISOR_LOG_LEVEL
# - CRYPTO_ADVISOR_LOG_FORMAT

[gateway]
# Crypto Advisor backend
backend_url = "http://localhost:8080"

# Market-data provider (CoinGecko compatible)
price_api_url = "https://api.coingecko.com/api/v3"

# Request timeout (ms)
request_timeout_ms = 10000

[credentials]
# Session file; defaults to the platform data directory
# path = "~/.local/share/crypto-advisor/credentials.json"

[dashboard]
# Coins quoted when no interests were selected during onboarding
default_basket = ["bitcoin", "ethereum", "cardano", "solana"]

# Image shown when a meme fails to load
placeholder_image_url = "https://via.placeholder.com/300x200?text=Meme+Not+Available"

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
