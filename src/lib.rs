//! Huginn - cached, deduplicated, rate-limited AI request gateway
//!
//! [`AiGateway`] sits between an application and an OpenAI-compatible
//! chat-completion API. Single-prompt requests are served from a two-tier
//! TTL cache when possible, identical concurrent requests share one network
//! call, a sliding-window limiter caps outbound traffic, and transient
//! provider failures are retried with exponential backoff.
//!
//! The [`coach`] module builds goal-coaching helpers on top of the gateway.
//!
//! # Example
//!
//! ```rust,no_run
//! use huginn::{CompletionOptions, Huginn};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let gateway = Huginn::builder().openai("sk-your-key").build()?;
//!
//!     match gateway.complete("Say hello", &CompletionOptions::default()).await? {
//!         Some(text) => println!("{text}"),
//!         None => println!("(no answer, showing fallback)"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//!
//! Only [`HuginnError::LocalRateLimited`], [`HuginnError::ProviderRateLimited`]
//! and [`HuginnError::InvalidCredential`] are returned as `Err`. Every other
//! failure is logged through `tracing` and surfaces as `Ok(None)`.

pub mod cache;
pub mod clock;
pub mod coach;
pub mod config;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, DurableStore, FileStore, MemoryStore, ResponseCache, cache_key};
pub use clock::{Clock, ManualClock, SystemClock};
pub use coach::{
    Coach, GoalAnalysis, GoalCategory, GoalContext, GoalImage, ImageSearchClient, Priority,
    ProgressAnalysis, ProgressEntry, TodoSuggestion, Trend,
};
pub use config::GatewayConfig;
pub use error::{HuginnError, Result};
pub use gateway::{AiGateway, Huginn, HuginnBuilder, RateLimitConfig, RateLimiter};
pub use providers::{
    CompletionTransport, CredentialSource, EnvCredentials, HttpTransport, Provider, ProviderKind,
    RetryConfig, StaticCredentials,
};
pub use types::{CompletionOptions, Message, Role};
pub use version::{PKG_VERSION, version_string};
