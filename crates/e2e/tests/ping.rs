//! Readiness polling against fake probes (paused clock) and real sockets

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use tokio::time::Instant;

use sitegate_e2e::{
    E2eError, ErrorClass, Pinger, PollOutcome, PollRequest, Probe, ProbeError, RetryPolicy,
};

/// Fails with `class` until call number `ready_on` (never when `None`)
struct ScriptedProbe {
    class: ErrorClass,
    /// How long a failing attempt takes, capped at the attempt timeout
    attempt_cost: Duration,
    ready_on: Option<u32>,
    calls: AtomicU32,
    started: Mutex<Vec<Instant>>,
}

impl ScriptedProbe {
    fn failing(class: ErrorClass, attempt_cost: Duration) -> Arc<Self> {
        Arc::new(Self {
            class,
            attempt_cost,
            ready_on: None,
            calls: AtomicU32::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    fn ready_on(call: u32) -> Arc<Self> {
        Arc::new(Self {
            class: ErrorClass::ConnectionRefused,
            attempt_cost: Duration::ZERO,
            ready_on: Some(call),
            calls: AtomicU32::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    fn starts(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, _url: &str, timeout: Duration) -> Result<u16, ProbeError> {
        self.started.lock().unwrap().push(Instant::now());
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.ready_on.is_some_and(|n| call >= n) {
            return Ok(200);
        }
        tokio::time::sleep(self.attempt_cost.min(timeout)).await;
        Err(ProbeError::new(self.class, "scripted failure"))
    }
}

fn request(total: Duration) -> PollRequest {
    PollRequest::new("http://localhost:3000", total).unwrap()
}

#[tokio::test(start_paused = true)]
async fn never_ready_target_fails_at_the_deadline() {
    let total = Duration::from_secs(5);
    let probe = ScriptedProbe::failing(ErrorClass::ConnectionRefused, Duration::ZERO);
    let pinger = Pinger::with_probe(probe.clone());

    let begin = Instant::now();
    let outcome = pinger.poll(&request(total)).await;
    let elapsed = begin.elapsed();

    match outcome {
        PollOutcome::Failed { last_error, .. } => {
            assert_eq!(last_error.class, ErrorClass::ConnectionRefused)
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(elapsed >= total, "gave up early after {:?}", elapsed);
    assert!(elapsed < total + Duration::from_secs(5));

    // one attempt per second, none at or past the deadline
    let starts = probe.starts();
    assert_eq!(starts.len(), 5);
    assert!(starts.iter().all(|s| s.duration_since(begin) < total));
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_overshoot_by_at_most_one_attempt() {
    let total = Duration::from_secs(45);
    let probe = ScriptedProbe::failing(ErrorClass::Timeout, Duration::from_secs(120));
    let pinger = Pinger::with_probe(probe.clone());

    let begin = Instant::now();
    let outcome = pinger.poll(&request(total)).await;
    let elapsed = begin.elapsed();

    assert!(!outcome.is_ready());
    // attempts are capped at 30s: 0..30, 31..61
    assert_eq!(outcome.attempts(), 2);
    assert!(elapsed >= total);
    assert!(elapsed <= total + Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn target_coming_up_is_ready_on_first_success() {
    let probe = ScriptedProbe::ready_on(4);
    let pinger = Pinger::with_probe(probe.clone());

    let begin = Instant::now();
    let outcome = pinger.poll(&request(Duration::from_secs(60))).await;

    match outcome {
        PollOutcome::Ready { attempts, elapsed } => {
            assert_eq!(attempts, 4);
            assert_eq!(elapsed, Duration::from_secs(3));
        }
        other => panic!("expected ready, got {:?}", other),
    }
    // no further attempts once ready
    assert_eq!(probe.starts().len(), 4);
    assert_eq!(begin.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn custom_policy_sets_the_retry_pace() {
    let policy = RetryPolicy {
        refused_delay: Duration::from_millis(250),
        retry_delay: Duration::from_millis(500),
        ..RetryPolicy::default()
    };
    let probe = ScriptedProbe::failing(ErrorClass::ConnectionRefused, Duration::ZERO);
    let pinger = Pinger::with_probe(probe.clone()).with_policy(policy);
    assert_eq!(*pinger.policy(), policy);

    let begin = Instant::now();
    let outcome = pinger.poll(&request(Duration::from_secs(1))).await;

    assert!(!outcome.is_ready());
    // attempts at 0, 250, 500 and 750 ms
    let offsets: Vec<u128> = probe
        .starts()
        .iter()
        .map(|s| s.duration_since(begin).as_millis())
        .collect();
    assert_eq!(offsets, vec![0, 250, 500, 750]);
}

#[tokio::test(start_paused = true)]
async fn ping_error_names_url_and_timeout() {
    let probe = ScriptedProbe::failing(ErrorClass::OtherNetwork, Duration::ZERO);
    let pinger = Pinger::with_probe(probe);

    let err = pinger
        .ping("http://localhost:3000", Duration::from_secs(3))
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::ReadinessTimeout { .. }));
    let message = err.to_string();
    assert!(message.contains("http://localhost:3000"), "{}", message);
    assert!(message.contains("3000 ms"), "{}", message);
}

#[tokio::test]
async fn refused_port_times_out_with_real_client() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{}/", port);
    let total = Duration::from_secs(2);

    let begin = std::time::Instant::now();
    let err = Pinger::new().unwrap().ping(&url, total).await.unwrap_err();
    let elapsed = begin.elapsed();

    assert!(matches!(err, E2eError::ReadinessTimeout { .. }));
    assert!(err.to_string().contains(&url));
    assert!(elapsed >= total, "gave up early after {:?}", elapsed);
    assert!(elapsed < total + Duration::from_secs(10));
}

#[tokio::test]
async fn server_error_status_counts_as_ready() {
    let app = Router::new().route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let url = format!("http://{}/", addr);
    let elapsed = Pinger::new()
        .unwrap()
        .ping(&url, Duration::from_secs(10))
        .await
        .unwrap();

    assert!(elapsed < Duration::from_secs(10));
    server.abort();
}
