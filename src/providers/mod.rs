//! Provider plumbing: credential resolution, the HTTP transport, and
//! retry/backoff configuration.

pub mod credentials;
pub mod openai;
pub mod retry;

pub use credentials::{CredentialSource, EnvCredentials, Provider, ProviderKind, StaticCredentials};
pub use openai::{CompletionTransport, HttpTransport};
pub use retry::RetryConfig;
