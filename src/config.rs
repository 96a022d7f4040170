//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` / explicit path (must exist)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//! 4. built-in defaults
//!
//! Credentials never live in the config file. The `[credentials]` section
//! only names the environment variables they are read from, and those are
//! re-read on every request.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{CacheConfig, DEFAULT_STORAGE_KEY, FileStore};
use crate::coach::{DEFAULT_ACCESS_KEY_ENV, ImageSearchClient};
use crate::gateway::{DEFAULT_MODEL, RateLimitConfig};
use crate::providers::credentials::DEFAULT_ENV_VARS;
use crate::providers::{EnvCredentials, ProviderKind, RetryConfig};
use crate::{HuginnError, Result};

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Model used when a request doesn't name one.
    #[serde(default = "default_model")]
    pub model: String,
    /// Override for the provider's API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-attempt HTTP timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub credentials: CredentialsSection,
    #[serde(default)]
    pub images: ImagesSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            request_timeout_secs: default_timeout(),
            cache: CacheSection::default(),
            rate_limit: RateLimitSection::default(),
            retry: RetrySection::default(),
            credentials: CredentialsSection::default(),
            images: ImagesSection::default(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// `[cache]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Entry time-to-live in seconds (default: 300).
    pub ttl_secs: u64,
    /// Capacity of the in-memory tier (default: 1000).
    pub max_memory_entries: u64,
    /// Durable storage key.
    pub storage_key: String,
    /// Directory for the file-backed durable tier (default: platform cache dir).
    pub dir: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            max_memory_entries: 1_000,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            dir: None,
        }
    }
}

/// `[rate_limit]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Calls allowed per window (default: 8).
    pub max_requests: usize,
    /// Window length in seconds (default: 60).
    pub window_secs: u64,
    /// Whether retry attempts consume slots (default: true).
    pub count_retries: bool,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 8,
            window_secs: 60,
            count_retries: true,
        }
    }
}

/// `[retry]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Retries after the first attempt (default: 3).
    pub max_retries: u32,
    /// Backoff base in milliseconds (default: 2000).
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds (default: 60000).
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
        }
    }
}

/// `[credentials]`: which environment variables hold provider keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    pub env: Vec<EnvVar>,
}

/// One `[[credentials.env]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvVar {
    pub provider: ProviderKind,
    pub var: String,
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            env: DEFAULT_ENV_VARS
                .iter()
                .map(|(provider, var)| EnvVar {
                    provider: *provider,
                    var: (*var).to_string(),
                })
                .collect(),
        }
    }
}

/// `[images]`: image search for goal artwork.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    /// Environment variable holding the Unsplash access key.
    pub access_key_env: String,
    /// Override for the Unsplash API base URL.
    pub base_url: Option<String>,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            access_key_env: DEFAULT_ACCESS_KEY_ENV.to_string(),
            base_url: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first of
    /// `~/.huginn/config.toml` and `/etc/huginn/config.toml` that exists is
    /// used, falling back to defaults when neither does.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .ttl(Duration::from_secs(self.cache.ttl_secs))
            .max_memory_entries(self.cache.max_memory_entries)
            .storage_key(self.cache.storage_key.clone())
    }

    /// File-backed durable store at `[cache] dir`, or the platform default.
    pub fn file_store(&self) -> FileStore {
        match &self.cache.dir {
            Some(dir) => FileStore::new(dir),
            None => FileStore::default_location(),
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(
            self.rate_limit.max_requests,
            Duration::from_secs(self.rate_limit.window_secs),
        )
        .count_retries(self.rate_limit.count_retries)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_retries.saturating_add(1))
            .initial_delay(Duration::from_millis(self.retry.base_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn env_credentials(&self) -> EnvCredentials {
        EnvCredentials::with_vars(
            self.credentials
                .env
                .iter()
                .map(|e| (e.provider, e.var.clone())),
        )
    }

    /// Unsplash client reading its key from `[images] access_key_env`.
    pub fn image_client(&self) -> Result<ImageSearchClient> {
        let client = ImageSearchClient::from_env(self.images.access_key_env.clone())?;
        Ok(match &self.images.base_url {
            Some(url) => client.base_url(url.clone()),
            None => client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gateway_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.cache_config(), CacheConfig::default());
        assert_eq!(config.rate_limit_config(), RateLimitConfig::default());
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn parse_empty_config() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.credentials.env.len(), 2);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            model = "gpt-4o"
            base_url = "http://localhost:8080/v1"
            request_timeout_secs = 10

            [cache]
            ttl_secs = 60
            storage_key = "coach_cache"
            dir = "/var/cache/coach"

            [rate_limit]
            max_requests = 20
            window_secs = 30
            count_retries = false

            [retry]
            max_retries = 1
            base_delay_ms = 100

            [[credentials.env]]
            provider = "openrouter"
            var = "COACH_ROUTER_KEY"

            [images]
            access_key_env = "COACH_UNSPLASH"
        "#;
        let config = GatewayConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));

        let cache = config.cache_config();
        assert_eq!(cache.ttl, Duration::from_secs(60));
        assert_eq!(cache.storage_key, "coach_cache");
        assert_eq!(cache.max_memory_entries, 1_000);
        assert_eq!(config.file_store().dir(), Path::new("/var/cache/coach"));

        let limits = config.rate_limit_config();
        assert_eq!(limits.max_requests, 20);
        assert_eq!(limits.window, Duration::from_secs(30));
        assert!(!limits.count_retries);

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));

        assert_eq!(config.credentials.env.len(), 1);
        assert_eq!(config.credentials.env[0].provider, ProviderKind::OpenRouter);
        assert_eq!(config.images.access_key_env, "COACH_UNSPLASH");
    }

    #[test]
    fn unknown_provider_rejected() {
        let toml = r#"
            [[credentials.env]]
            provider = "anthropic"
            var = "X"
        "#;
        assert!(GatewayConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = GatewayConfig::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }
}
