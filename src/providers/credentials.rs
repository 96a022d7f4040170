//! Provider resolution.
//!
//! The active provider is re-derived on every gateway call so that a
//! credential added (or revoked) at runtime takes effect without a restart.
//! A missing credential is not an error: the gateway treats it as "AI
//! features switched off" and every request resolves to `Ok(None)`.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Default base URL for the OpenAI API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default base URL for OpenRouter's OpenAI-compatible API.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Which chat-completion service a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => OPENAI_BASE_URL,
            ProviderKind::OpenRouter => OPENROUTER_BASE_URL,
        }
    }
}

/// A resolved provider: service tag plus a non-empty, trimmed credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Provider {
    pub kind: ProviderKind,
    api_key: String,
}

impl Provider {
    /// Build a provider, returning `None` for a blank credential.
    pub fn new(kind: ProviderKind, api_key: impl AsRef<str>) -> Option<Self> {
        let trimmed = api_key.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            api_key: trimmed.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

// Keep the key out of logs.
impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("kind", &self.kind)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Anything that can answer "which provider is configured right now?".
pub trait CredentialSource: Send + Sync {
    fn resolve(&self) -> Option<Provider>;
}

/// Provider kind → environment variable name, in priority order.
pub const DEFAULT_ENV_VARS: &[(ProviderKind, &str)] = &[
    (ProviderKind::OpenAi, "OPENAI_API_KEY"),
    (ProviderKind::OpenRouter, "OPENROUTER_API_KEY"),
];

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads credentials from environment variables on every call.
///
/// The first variable in the list holding a non-blank value wins.
#[derive(Clone)]
pub struct EnvCredentials {
    vars: Vec<(ProviderKind, String)>,
    lookup: Lookup,
}

impl EnvCredentials {
    /// Use [`DEFAULT_ENV_VARS`].
    pub fn new() -> Self {
        Self::with_vars(
            DEFAULT_ENV_VARS
                .iter()
                .map(|(kind, var)| (*kind, (*var).to_string())),
        )
    }

    /// Use a custom priority list.
    pub fn with_vars(vars: impl IntoIterator<Item = (ProviderKind, String)>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
            lookup: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the variable lookup (tests use a map instead of the process env).
    pub fn lookup_with(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.lookup = Arc::new(lookup);
        self
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentials {
    fn resolve(&self) -> Option<Provider> {
        self.vars
            .iter()
            .find_map(|(kind, var)| (self.lookup)(var).and_then(|key| Provider::new(*kind, key)))
    }
}

/// A fixed provider, or a fixed absence of one.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<Provider>);

impl StaticCredentials {
    pub fn new(provider: Option<Provider>) -> Self {
        Self(provider)
    }

    /// Shorthand for an OpenAI key.
    pub fn openai(api_key: impl AsRef<str>) -> Self {
        Self(Provider::new(ProviderKind::OpenAi, api_key))
    }

    /// No provider configured.
    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn resolve(&self) -> Option<Provider> {
        self.0.clone()
    }
}
