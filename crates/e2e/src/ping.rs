//! Readiness polling - waiting until a URL answers
//!
//! Any HTTP response counts as ready: connectivity is checked, not
//! application health. The wall-clock deadline is the only bound on the
//! loop; no attempt starts once it has passed.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::error::{E2eError, E2eResult};

/// Upper bound for a single attempt
pub const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry delay while the target refuses connections (still starting up)
pub const REFUSED_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Retry delay for every other failure
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

const ACCEPT: &str = "text/html, application/json, text/plain, */*";

/// Why an attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ConnectionRefused,
    Timeout,
    OtherNetwork,
    None,
}

/// Failure of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError {
    pub class: ErrorClass,
    pub message: String,
}

impl ProbeError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.class)
    }
}

/// One request against the target
#[async_trait]
pub trait Probe: Send + Sync {
    /// Returns the HTTP status of whatever answered
    async fn probe(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError>;
}

/// Probe issuing plain GET requests
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str, timeout: Duration) -> Result<u16, ProbeError> {
        match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(e) => Err(ProbeError::new(classify(&e), e.to_string())),
        }
    }
}

/// Classify a client error, looking through its source chain
pub fn classify(err: &reqwest::Error) -> ErrorClass {
    if err.is_timeout() {
        return ErrorClass::Timeout;
    }

    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ErrorClass::ConnectionRefused,
                std::io::ErrorKind::TimedOut => return ErrorClass::Timeout,
                _ => {}
            }
        }
        source = e.source();
    }

    ErrorClass::OtherNetwork
}

/// A URL to wait for and the total time allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub url: String,
    pub total_timeout: Duration,
}

impl PollRequest {
    pub fn new(url: impl Into<String>, total_timeout: Duration) -> E2eResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(E2eError::InvalidPollRequest("url must not be empty".into()));
        }
        if total_timeout.is_zero() {
            return Err(E2eError::InvalidPollRequest(
                "expected a timeout greater than zero".into(),
            ));
        }
        Ok(Self { url, total_timeout })
    }
}

/// Record of one attempt, logged and dropped
#[derive(Debug, Clone, Copy)]
pub struct PollAttempt {
    pub attempt_index: u32,
    pub elapsed: Duration,
    pub error_class: ErrorClass,
}

/// Terminal value of a poll, produced once per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready {
        elapsed: Duration,
        attempts: u32,
    },
    Failed {
        last_error: ProbeError,
        elapsed: Duration,
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. } | PollOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Fixed-interval retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempt_cap: Duration,
    pub refused_delay: Duration,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_cap: MAX_ATTEMPT_TIMEOUT,
            refused_delay: REFUSED_RETRY_DELAY,
            retry_delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn attempt_timeout(&self, total: Duration) -> Duration {
        total.min(self.attempt_cap)
    }

    pub fn delay_for(&self, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::ConnectionRefused => self.refused_delay,
            _ => self.retry_delay,
        }
    }

    /// Attempts a run of full-length timeouts would need to cover `total`
    ///
    /// Informational only, the deadline decides when polling stops.
    pub fn soft_attempt_limit(&self, total: Duration) -> u64 {
        let per_attempt = self.attempt_timeout(total).as_millis().max(1);
        total.as_millis().div_ceil(per_attempt) as u64
    }
}

/// The one retry primitive used by every phase
#[derive(Clone)]
pub struct Pinger {
    probe: Arc<dyn Probe>,
    policy: RetryPolicy,
}

impl Pinger {
    /// Pinger issuing real HTTP requests
    pub fn new() -> E2eResult<Self> {
        Ok(Self::with_probe(Arc::new(HttpProbe::new()?)))
    }

    pub fn with_probe(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll until the URL answers or the deadline passes
    pub async fn poll(&self, request: &PollRequest) -> PollOutcome {
        let total = request.total_timeout;
        let per_attempt = self.policy.attempt_timeout(total);

        debug!(
            "pinging \"{}\" for {} ms max (attempt timeout {} ms, soft attempt limit {})",
            request.url,
            total.as_millis(),
            per_attempt.as_millis(),
            self.policy.soft_attempt_limit(total)
        );

        let start = Instant::now();
        let mut attempt_index: u32 = 0;

        loop {
            let result = self.probe.probe(&request.url, per_attempt).await;
            let elapsed = start.elapsed();
            let attempts = attempt_index + 1;

            let last_error = match result {
                Ok(status) => {
                    debug!(
                        "pinging {} has finished ok after {}ms (status {})",
                        request.url,
                        elapsed.as_millis(),
                        status
                    );
                    return PollOutcome::Ready { elapsed, attempts };
                }
                Err(e) => e,
            };

            let attempt = PollAttempt {
                attempt_index,
                elapsed,
                error_class: last_error.class,
            };
            debug!(
                "{}ms attempt {} {:?}: {}",
                attempt.elapsed.as_millis(),
                attempt.attempt_index,
                attempt.error_class,
                last_error.message
            );

            if elapsed >= total {
                error!(
                    "{} timed out after {}ms, timeout was {}ms",
                    request.url,
                    elapsed.as_millis(),
                    total.as_millis()
                );
                return PollOutcome::Failed {
                    last_error,
                    elapsed,
                    attempts,
                };
            }

            // never sleep past the deadline, the next attempt must start before it
            let delay = self.policy.delay_for(last_error.class).min(total - elapsed);
            sleep(delay).await;
            attempt_index += 1;

            if start.elapsed() >= total {
                let elapsed = start.elapsed();
                error!(
                    "{} timed out after {}ms, timeout was {}ms",
                    request.url,
                    elapsed.as_millis(),
                    total.as_millis()
                );
                return PollOutcome::Failed {
                    last_error,
                    elapsed,
                    attempts,
                };
            }
        }
    }

    /// Poll and turn a failed outcome into an error naming URL and timeout
    pub async fn ping(&self, url: &str, total_timeout: Duration) -> E2eResult<Duration> {
        let request = PollRequest::new(url, total_timeout)?;
        match self.poll(&request).await {
            PollOutcome::Ready { elapsed, .. } => {
                info!("{} responds after {} ms", url, elapsed.as_millis());
                Ok(elapsed)
            }
            PollOutcome::Failed { last_error, .. } => Err(E2eError::ReadinessTimeout {
                url: request.url,
                timeout: total_timeout,
                last_error: last_error.to_string(),
            }),
        }
    }
}
