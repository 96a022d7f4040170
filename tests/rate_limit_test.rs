//! Local sliding-window admission through the gateway.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedTransport, builder};
use huginn::{CompletionOptions, HuginnError, ManualClock, Message, RateLimitConfig};

const START: u64 = 1_700_000_000_000;

#[tokio::test]
async fn ninth_call_in_a_minute_is_denied_then_readmitted() {
    let clock = ManualClock::new(START);
    let transport = ScriptedTransport::succeeding();
    let gw = builder(transport.clone())
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    let options = CompletionOptions::default();

    for i in 0..8 {
        let prompt = format!("prompt {i}");
        assert!(gw.complete(&prompt, &options).await.unwrap().is_some());
        clock.advance(Duration::from_secs(1));
    }

    let err = gw.complete("prompt 8", &options).await.unwrap_err();
    assert_eq!(
        err,
        HuginnError::LocalRateLimited {
            retry_after: Duration::from_secs(52)
        }
    );
    assert_eq!(transport.calls(), 8);

    // the first call leaves the window 60s after it was made
    clock.set(START + 60_000);
    assert!(gw.complete("prompt 8", &options).await.unwrap().is_some());
    assert_eq!(transport.calls(), 9);
}

#[tokio::test]
async fn cache_hits_do_not_consume_slots() {
    let clock = ManualClock::new(START);
    let transport = ScriptedTransport::succeeding();
    let gw = builder(transport.clone())
        .clock(Arc::new(clock))
        .rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)))
        .build()
        .unwrap();
    let options = CompletionOptions::default();

    for _ in 0..5 {
        assert!(gw.complete("ping", &options).await.unwrap().is_some());
    }
    assert_eq!(transport.calls(), 1);
    assert_eq!(gw.rate_limiter().in_window(), 1);
}

#[tokio::test]
async fn chat_shares_the_limit() {
    let clock = ManualClock::new(START);
    let transport = ScriptedTransport::succeeding();
    let gw = builder(transport.clone())
        .clock(Arc::new(clock))
        .rate_limit(RateLimitConfig::new(2, Duration::from_secs(60)))
        .build()
        .unwrap();
    let options = CompletionOptions::default();
    let conversation = [Message::user("hi")];

    gw.complete("ping", &options).await.unwrap();
    gw.chat(&conversation, &options).await.unwrap();

    let err = gw.chat(&conversation, &options).await.unwrap_err();
    assert!(matches!(err, HuginnError::LocalRateLimited { .. }));
    assert!(!gw.rate_limiter().can_make_request());
    assert_eq!(gw.rate_limiter().time_until_available(), Duration::from_secs(60));
}

#[tokio::test]
async fn joined_callers_share_one_slot() {
    let transport = ScriptedTransport::slow(Duration::from_millis(50));
    let gw = builder(transport.clone())
        .rate_limit(RateLimitConfig::new(1, Duration::from_secs(60)))
        .build()
        .unwrap();
    let options = CompletionOptions::default();

    let (a, b) = tokio::join!(gw.complete("ping", &options), gw.complete("ping", &options));

    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_some());
    assert_eq!(transport.calls(), 1);
}
