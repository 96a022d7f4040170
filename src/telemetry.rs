//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name ("openai", "openrouter")
//! - `status`: outcome: "ok", "empty" or "error"
//! - `tier`: cache tier that served a hit: "memory" or "durable"

/// Logical requests that reached the network (one per attempt loop).
///
/// Labels: `provider`, `status`.
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Duration of the whole attempt loop in seconds, backoff sleeps included.
///
/// Labels: `provider`.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "huginn_retries_total";

/// Response cache hits.
///
/// Labels: `tier`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Response cache misses (both tiers).
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Callers that joined an already in-flight identical request.
pub const DEDUP_JOINS_TOTAL: &str = "huginn_dedup_joins_total";

/// Calls refused by the local rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "huginn_rate_limited_total";
