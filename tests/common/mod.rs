//! Shared test doubles.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use huginn::types::{ChatRequest, TransportResponse};
use huginn::{AiGateway, CompletionTransport, HuginnBuilder, HuginnError, Provider, Result};
use tokio::time::Instant;

/// JSON body of a successful completion.
pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

pub fn ok(content: &str) -> Result<TransportResponse> {
    Ok(TransportResponse::new(200, completion_body(content)))
}

pub fn status(code: u16) -> Result<TransportResponse> {
    Ok(TransportResponse::new(code, "{}"))
}

pub fn throttled(retry_after: Option<Duration>) -> Result<TransportResponse> {
    let response = TransportResponse::new(429, r#"{"error": "rate limited"}"#);
    Ok(match retry_after {
        Some(wait) => response.with_retry_after(wait),
        None => response,
    })
}

pub fn network_error() -> Result<TransportResponse> {
    Err(HuginnError::Http("connection reset".into()))
}

/// Transport that plays back a fixed script of responses.
///
/// Once the script runs out every call answers `200 "ok"`. Each call
/// records the (tokio) instant it was made, so backoff gaps can be measured
/// under paused time.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportResponse>>>,
    latency: Duration,
    calls: AtomicU32,
    timestamps: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<TransportResponse>>) -> Arc<Self> {
        Arc::new(Self::build(script.into_iter().collect(), Duration::ZERO))
    }

    /// Answers every call with `200 "ok"`.
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), Duration::ZERO))
    }

    /// Answers every call with `200 "ok"` after `latency`.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), latency))
    }

    /// Plays `script` with each call taking `latency`.
    pub fn slow_script(
        latency: Duration,
        script: impl IntoIterator<Item = Result<TransportResponse>>,
    ) -> Arc<Self> {
        Arc::new(Self::build(script.into_iter().collect(), latency))
    }

    fn build(script: Vec<Result<TransportResponse>>, latency: Duration) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            latency,
            calls: AtomicU32::new(0),
            timestamps: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let stamps = self.timestamps.lock().unwrap();
        stamps.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn send(&self, _provider: &Provider, request: &ChatRequest) -> Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.timestamps.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| ok("ok"))
    }
}

/// Builder with a test key and the given transport.
pub fn builder(transport: Arc<ScriptedTransport>) -> HuginnBuilder {
    huginn::Huginn::builder()
        .openai("sk-test")
        .transport(transport)
}

pub fn gateway(transport: Arc<ScriptedTransport>) -> AiGateway {
    builder(transport).build().unwrap()
}
