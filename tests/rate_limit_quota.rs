//! The account-wide quota holds under concurrent callers.

mod common;

use common::{builder_with, ScriptedTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use wb_api_client::resilience::{RateLimiter, RateLimiterConfig};
use wb_api_client::{ApiClient, Error, RequestContext};

/// Largest number of sends inside any window, checked against `burst + rate * window`.
fn assert_within_quota(sent: &[Instant], burst: f64, per_second: f64) {
    let mut sent = sent.to_vec();
    sent.sort();
    for i in 0..sent.len() {
        for j in i..sent.len() {
            let window = (sent[j] - sent[i]).as_secs_f64();
            let count = (j - i + 1) as f64;
            assert!(
                count <= burst + per_second * window + 1e-6,
                "{} sends within {:.3}s exceeds burst {} + rate {}/s",
                count,
                window,
                burst,
                per_second
            );
        }
    }
}

fn tight_client(transport: Arc<ScriptedTransport>) -> ApiClient {
    builder_with(transport)
        .rate_limit(60)
        .burst_limit(5)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_quota() {
    let transport = ScriptedTransport::always_ok();
    let client = tight_client(transport.clone());

    let start = Instant::now();
    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client.ping(&RequestContext::new()).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(transport.calls(), 20);
    // Five from the burst, the other fifteen at one per second.
    assert!(start.elapsed() >= Duration::from_secs(15));
    assert_within_quota(&transport.sent_at(), 5.0, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_quota_holds_across_rates_bursts_and_callers() {
    for per_minute in [30u32, 90, 150, 600] {
        for burst in [1u32, 2, 5, 9] {
            for callers in [3usize, 12, 25] {
                let transport = ScriptedTransport::always_ok();
                let client = builder_with(transport.clone())
                    .rate_limit(per_minute)
                    .burst_limit(burst)
                    .build()
                    .unwrap();

                let start = Instant::now();
                let handles: Vec<_> = (0..callers)
                    .map(|_| {
                        let client = client.clone();
                        tokio::spawn(async move { client.ping(&RequestContext::new()).await })
                    })
                    .collect();
                for h in handles {
                    h.await.unwrap().unwrap();
                }

                let per_second = f64::from(per_minute) / 60.0;
                assert_eq!(transport.calls(), callers);
                assert_within_quota(&transport.sent_at(), f64::from(burst), per_second);

                // Callers beyond the burst are admitted one refill interval apart.
                let queued = callers.saturating_sub(burst as usize) as f64;
                let floor = Duration::from_secs_f64(queued / per_second);
                assert!(
                    start.elapsed() + Duration::from_millis(1) >= floor,
                    "rate {}/min burst {} callers {}: finished in {:?}, expected at least {:?}",
                    per_minute,
                    burst,
                    callers,
                    start.elapsed(),
                    floor
                );
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_clients_sharing_a_limiter_share_quota() {
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::per_minute(120, 3)));
    let transport = ScriptedTransport::always_ok();
    let a = builder_with(transport.clone())
        .shared_rate_limiter(limiter.clone())
        .build()
        .unwrap();
    let b = builder_with(transport.clone())
        .shared_rate_limiter(limiter)
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..12 {
        let client = if i % 2 == 0 { a.clone() } else { b.clone() };
        handles.push(tokio::spawn(async move {
            client.ping(&RequestContext::new()).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    assert_eq!(transport.calls(), 12);
    assert_within_quota(&transport.sent_at(), 3.0, 2.0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_consume_tokens() {
    let transport = ScriptedTransport::new(vec![
        common::Step::refused(),
        common::Step::refused(),
        common::Step::refused(),
    ]);
    let client = builder_with(transport.clone())
        .rate_limit(60)
        .burst_limit(2)
        .build()
        .unwrap();

    let start = Instant::now();
    let err = client.ping(&RequestContext::new()).await.unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    // Two attempts ride the burst, the third waits a full refill interval.
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_within_quota(&transport.sent_at(), 2.0, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_expired_waiters_leave_tokens_for_others() {
    let transport = ScriptedTransport::always_ok();
    let client = tight_client(transport.clone());

    // Drain the burst.
    for _ in 0..5 {
        client.ping(&RequestContext::new()).await.unwrap();
    }

    // These cannot get a token within 100ms and must fail without taking one.
    let mut impatient = Vec::new();
    for _ in 0..3 {
        let client = client.clone();
        impatient.push(tokio::spawn(async move {
            let ctx = RequestContext::new().with_timeout(Duration::from_millis(100));
            client.ping(&ctx).await
        }));
    }
    for h in impatient {
        let err = h.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
    assert_eq!(transport.calls(), 5);

    let start = Instant::now();
    client.ping(&RequestContext::new()).await.unwrap();
    // Only the regular refill gates the next caller.
    assert!(start.elapsed() <= Duration::from_secs(1));
    assert_eq!(transport.calls(), 6);
}
