use std::time::Duration;

use huginn::{HuginnError, Result};

#[test]
fn test_error_display() {
    let err = HuginnError::Api {
        status: 503,
        message: "overloaded".to_string(),
    };
    assert_eq!(err.to_string(), "API error (503): overloaded");
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(HuginnError::InvalidCredential)
    }
    assert!(returns_error().is_err());
}

#[test]
fn local_rate_limit_message_mentions_wait() {
    let err = HuginnError::LocalRateLimited {
        retry_after: Duration::from_secs(52),
    };
    assert!(err.to_string().contains("52s"));
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn user_facing_errors() {
    assert!(
        HuginnError::LocalRateLimited {
            retry_after: Duration::from_secs(1)
        }
        .is_user_facing()
    );
    assert!(HuginnError::ProviderRateLimited { retry_after: None }.is_user_facing());
    assert!(HuginnError::InvalidCredential.is_user_facing());

    assert!(!HuginnError::Http("reset".into()).is_user_facing());
    assert!(
        !HuginnError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_user_facing()
    );
    assert!(!HuginnError::Storage("quota".into()).is_user_facing());
}

#[test]
fn transient_errors() {
    assert!(HuginnError::ProviderRateLimited { retry_after: None }.is_transient());
    assert!(HuginnError::Http("connection reset".into()).is_transient());
    assert!(HuginnError::Json("eof".into()).is_transient());
    assert!(
        HuginnError::Api {
            status: 502,
            message: "bad gateway".into()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    assert!(!HuginnError::InvalidCredential.is_transient());
    assert!(
        !HuginnError::LocalRateLimited {
            retry_after: Duration::from_secs(1)
        }
        .is_transient()
    );
    assert!(
        !HuginnError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient()
    );
    assert!(!HuginnError::Configuration("bad".into()).is_transient());
}

#[test]
fn retry_after_hints() {
    let local = HuginnError::LocalRateLimited {
        retry_after: Duration::from_secs(30),
    };
    assert_eq!(local.retry_after(), Some(Duration::from_secs(30)));

    let provider = HuginnError::ProviderRateLimited {
        retry_after: Some(Duration::from_secs(5)),
    };
    assert_eq!(provider.retry_after(), Some(Duration::from_secs(5)));

    assert_eq!(HuginnError::InvalidCredential.retry_after(), None);
}

#[test]
fn json_error_converts() {
    let err: HuginnError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, HuginnError::Json(_)));
}
