//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use super::{
    AiGateway, DEFAULT_MODEL, GatewayInner, InflightRegistry, RateLimitConfig, RateLimiter,
};
use crate::Result;
use crate::cache::{CacheConfig, DurableStore, MemoryStore, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::providers::openai::DEFAULT_TIMEOUT;
use crate::providers::{
    CompletionTransport, CredentialSource, EnvCredentials, HttpTransport, RetryConfig,
    StaticCredentials,
};

/// Main entry point for creating gateway instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// Every piece has a default: credentials come from the environment, the
/// durable tier is in-memory, and time is the system clock.
pub struct HuginnBuilder {
    model: String,
    base_url: Option<String>,
    timeout: Duration,
    cache: CacheConfig,
    rate_limit: RateLimitConfig,
    retry: RetryConfig,
    credentials: Option<Arc<dyn CredentialSource>>,
    transport: Option<Arc<dyn CompletionTransport>>,
    store: Option<Arc<dyn DurableStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            credentials: None,
            transport: None,
            store: None,
            clock: None,
        }
    }

    /// Apply a loaded configuration file.
    pub fn config(mut self, config: &GatewayConfig) -> Self {
        self.model = config.model.clone();
        self.base_url = config.base_url.clone();
        self.timeout = Duration::from_secs(config.request_timeout_secs);
        self.cache = config.cache_config();
        self.rate_limit = config.rate_limit_config();
        self.retry = config.retry_config();
        self.credentials = Some(Arc::new(config.env_credentials()));
        self
    }

    /// Model used when a request doesn't name one.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send every request to this base URL instead of the provider default.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-attempt HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Resolve credentials through a custom source.
    pub fn credentials(mut self, source: impl CredentialSource + 'static) -> Self {
        self.credentials = Some(Arc::new(source));
        self
    }

    /// Use a fixed OpenAI key.
    pub fn openai(self, api_key: impl AsRef<str>) -> Self {
        self.credentials(StaticCredentials::openai(api_key))
    }

    /// Replace the HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn CompletionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Back the durable cache tier with `store`.
    pub fn store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the gateway.
    ///
    /// Succeeds without any credential: an unconfigured gateway simply
    /// answers every request with `Ok(None)`.
    pub fn build(self) -> Result<AiGateway> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(EnvCredentials::new()));

        let transport: Arc<dyn CompletionTransport> = match self.transport {
            Some(transport) => transport,
            None => match self.base_url {
                Some(url) => Arc::new(HttpTransport::with_base_url(self.timeout, url)?),
                None => Arc::new(HttpTransport::new(self.timeout)?),
            },
        };

        Ok(AiGateway::from_inner(GatewayInner {
            model: self.model,
            credentials,
            transport,
            cache: ResponseCache::new(&self.cache, store, Arc::clone(&clock)),
            inflight: InflightRegistry::new(),
            limiter: RateLimiter::new(self.rate_limit, clock),
            retry: self.retry,
        }))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
