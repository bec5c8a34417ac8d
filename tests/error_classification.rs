//! Tests for error classification logic

use std::time::Duration;
use wb_api_client::error_code::classify_dyn;
use wb_api_client::{classify, CancelReason, Error, ErrorCategory, TransportError};

#[test]
fn test_message_heuristics() {
    let cases = [
        ("wb api error: status 401, body: unauthorized", ErrorCategory::AuthFailed),
        ("request Forbidden by policy", ErrorCategory::AuthFailed),
        ("context deadline exceeded", ErrorCategory::Timeout),
        ("i/o timeout", ErrorCategory::Timeout),
        ("dial tcp: connection refused", ErrorCategory::Network),
        ("lookup content-api.wildberries.ru: no such host", ErrorCategory::Network),
        ("wb api error: status 429, body: ", ErrorCategory::RateLimit),
        ("429 Too Many Requests", ErrorCategory::RateLimit),
        ("something else entirely", ErrorCategory::Unknown),
        ("", ErrorCategory::Unknown),
    ];
    for (message, expected) in cases {
        assert_eq!(
            ErrorCategory::from_message(message),
            expected,
            "message {:?}",
            message
        );
    }
}

#[test]
fn test_priority_first_match_wins() {
    // Mentions both a 401 and a timeout: authentication comes first.
    assert_eq!(
        ErrorCategory::from_message("status 401 after timeout"),
        ErrorCategory::AuthFailed
    );
    // Timeout beats rate limiting.
    assert_eq!(
        ErrorCategory::from_message("429 then deadline exceeded"),
        ErrorCategory::Timeout
    );
}

#[test]
fn test_classification_is_deterministic() {
    let message = "max retries exceeded, last error: dial tcp: connection refused";
    let first = ErrorCategory::from_message(message);
    for _ in 0..100 {
        assert_eq!(ErrorCategory::from_message(message), first);
    }
}

#[test]
fn test_tags_and_messages_are_distinct() {
    let mut tags: Vec<&str> = ErrorCategory::PRIORITY.iter().map(|c| c.tag()).collect();
    tags.sort();
    tags.dedup();
    assert_eq!(tags.len(), 5);
    for category in ErrorCategory::PRIORITY {
        assert!(!category.human_message().is_empty());
    }
    assert_eq!(ErrorCategory::Network.tag(), "network_error");
}

#[test]
fn test_typed_classification() {
    let forbidden = Error::Remote {
        status: 403,
        body: "access denied".into(),
        retry_after: None,
    };
    assert_eq!(classify(&forbidden), ErrorCategory::AuthFailed);

    let throttled = Error::Remote {
        status: 429,
        body: String::new(),
        retry_after: Some(Duration::from_secs(1)),
    };
    assert_eq!(classify(&throttled), ErrorCategory::RateLimit);

    let slow = Error::Transport(TransportError::Timeout("operation timed out".into()));
    assert_eq!(classify(&slow), ErrorCategory::Timeout);

    let exhausted = Error::RetriesExhausted {
        attempts: 3,
        elapsed: Duration::from_secs(2),
        last: Some(Box::new(Error::Transport(TransportError::Connect(
            "connection refused".into(),
        )))),
    };
    assert_eq!(classify(&exhausted), ErrorCategory::Network);

    let cancelled = Error::Cancelled {
        stage: "rate limiter wait",
        reason: CancelReason::Cancelled,
    };
    assert_eq!(classify(&cancelled), ErrorCategory::Unknown);
}

#[test]
fn test_foreign_errors_fall_back_to_text() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "connection refused by peer");
    assert_eq!(classify_dyn(&io), ErrorCategory::Network);

    let ours = Error::Remote {
        status: 401,
        body: String::new(),
        retry_after: None,
    };
    assert_eq!(classify_dyn(&ours), ErrorCategory::AuthFailed);
}

#[test]
fn test_exhausted_retries_classified_by_last_error_only() {
    let dropped = || {
        Error::Transport(TransportError::Http(
            "error sending request: connection closed before message completed".into(),
        ))
    };
    // Elapsed times whose rendered millisecond count contains "401" or "429".
    for ms in [1400u64, 1401, 2429, 14290] {
        let err = Error::RetriesExhausted {
            attempts: 3,
            elapsed: Duration::from_millis(ms),
            last: Some(Box::new(dropped())),
        };
        assert!(err.to_string().contains(&format!("{}ms", ms)));
        assert_eq!(classify(&err), ErrorCategory::Unknown, "elapsed {}ms", ms);
        assert_eq!(err.diagnose().tag(), "unknown");
    }

    let err = Error::RetriesExhausted {
        attempts: 3,
        elapsed: Duration::from_millis(2429),
        last: Some(Box::new(Error::Transport(TransportError::Other(
            "dns error: failed to lookup address".into(),
        )))),
    };
    assert_eq!(classify(&err), ErrorCategory::Network);
}

#[test]
fn test_decode_failure_position_is_not_a_status() {
    let source = serde_json::from_str::<Vec<u32>>(&format!("{}x", " ".repeat(400))).unwrap_err();
    let err = Error::Decode {
        source,
        body: String::new(),
    };
    assert!(err.to_string().contains("401"));
    assert_eq!(classify(&err), ErrorCategory::Unknown);
}
