//! End-to-end gateway behaviour over real HTTP against a wiremock server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huginn::{
    AiGateway, CompletionOptions, EnvCredentials, Huginn, HuginnError, ManualClock, Message,
    ProviderKind, StaticCredentials,
};

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
}

fn gateway(server: &MockServer) -> AiGateway {
    Huginn::builder()
        .openai("sk-test")
        .base_url(server.uri())
        .build()
        .unwrap()
}

#[tokio::test]
async fn ping_pong_then_cache_hit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{ "role": "user", "content": "ping" }],
            "max_tokens": 100
        })))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let options = CompletionOptions::default().max_tokens(100);

    assert_eq!(gw.complete("ping", &options).await, Ok(Some("pong".to_string())));
    assert_eq!(gw.complete("ping", &options).await, Ok(Some("pong".to_string())));
}

#[tokio::test]
async fn different_parameters_miss_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("pong"))
        .expect(3)
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let base = CompletionOptions::default();
    gw.complete("ping", &base).await.unwrap();
    gw.complete("ping", &base.clone().max_tokens(64)).await.unwrap();
    gw.complete("ping", &base.clone().temperature(0.2)).await.unwrap();
}

#[tokio::test]
async fn unauthorized_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = gateway(&server)
        .complete("ping", &CompletionOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, HuginnError::InvalidCredential);
    assert!(err.is_user_facing());
}

#[tokio::test]
async fn server_error_yields_none_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway(&server)
        .complete("ping", &CompletionOptions::default())
        .await;
    assert_eq!(result, Ok(None));
}

#[tokio::test]
async fn retry_after_header_is_read() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let result = gateway(&server)
        .complete("ping", &CompletionOptions::default())
        .await;

    assert_eq!(result, Ok(Some("pong".to_string())));
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn unconfigured_gateway_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("pong"))
        .expect(0)
        .mount(&server)
        .await;

    let gw = Huginn::builder()
        .credentials(StaticCredentials::none())
        .base_url(server.uri())
        .build()
        .unwrap();

    assert!(!gw.is_configured());
    assert_eq!(gw.complete("ping", &CompletionOptions::default()).await, Ok(None));
    assert_eq!(gw.chat(&[Message::user("hi")], &CompletionOptions::default()).await, Ok(None));
}

#[tokio::test]
async fn credential_is_resolved_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-second"))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let key: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let source = EnvCredentials::with_vars([(ProviderKind::OpenAi, "KEY".to_string())])
        .lookup_with({
            let key = Arc::clone(&key);
            move |_| key.lock().unwrap().clone()
        });
    let gw = Huginn::builder()
        .credentials(source)
        .base_url(server.uri())
        .build()
        .unwrap();

    assert_eq!(gw.complete("ping", &CompletionOptions::default()).await, Ok(None));

    *key.lock().unwrap() = Some("  sk-second ".to_string());
    assert_eq!(
        gw.complete("ping", &CompletionOptions::default()).await,
        Ok(Some("pong".to_string()))
    );
}

#[tokio::test]
async fn chat_is_never_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "system", "content": "be brief" },
                { "role": "user", "content": "hi" }
            ]
        })))
        .respond_with(completion("hello"))
        .expect(2)
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let conversation = [Message::system("be brief"), Message::user("hi")];
    let options = CompletionOptions::default();

    assert_eq!(gw.chat(&conversation, &options).await, Ok(Some("hello".to_string())));
    assert_eq!(gw.chat(&conversation, &options).await, Ok(Some("hello".to_string())));
    assert_eq!(gw.cache().memory_len(), 0);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("pong").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let gw = gateway(&server);
    let options = CompletionOptions::default();

    let (a, b, c) = tokio::join!(
        gw.complete("ping", &options),
        gw.complete("ping", &options),
        gw.complete("ping", &options),
    );

    assert_eq!(a, Ok(Some("pong".to_string())));
    assert_eq!(b, a);
    assert_eq!(c, a);
    assert_eq!(gw.inflight_len(), 0);
}

#[tokio::test]
async fn request_uses_configured_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "model": "o3-mini" })))
        .respond_with(completion("pong"))
        .expect(1)
        .mount(&server)
        .await;

    let gw = Huginn::builder()
        .openai("sk-test")
        .model("gpt-4o")
        .base_url(server.uri())
        .build()
        .unwrap();

    gw.complete("ping", &CompletionOptions::default()).await.unwrap();
    gw.complete("ping", &CompletionOptions::default().model("o3-mini"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cached_answer_expires_after_five_minutes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("pong"))
        .expect(2)
        .mount(&server)
        .await;

    let clock = ManualClock::new(1_700_000_000_000);
    let gw = Huginn::builder()
        .openai("sk-test")
        .base_url(server.uri())
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let options = CompletionOptions::default();

    gw.complete("ping", &options).await.unwrap();

    clock.advance(Duration::from_secs(299));
    assert_eq!(gw.complete("ping", &options).await, Ok(Some("pong".to_string())));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));

    clock.advance(Duration::from_secs(1));
    assert_eq!(gw.complete("ping", &options).await, Ok(Some("pong".to_string())));
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(2));
}
