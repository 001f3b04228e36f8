//! Error types for phase orchestration

use std::time::Duration;

use thiserror::Error;

use crate::runner::SetupStep;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Config(#[from] sitegate_common::Error),

    #[error("Invalid poll request: {0}")]
    InvalidPollRequest(String),

    #[error("Pinging {url} for {ms} ms failed: {last_error}", ms = .timeout.as_millis())]
    ReadinessTimeout {
        url: String,
        timeout: Duration,
        last_error: String,
    },

    #[error("Failed to start \"{command}\": {reason}")]
    ProcessStart { command: String, reason: String },

    #[error("Could not serve folder {dir}: {source}")]
    Serve {
        dir: String,
        #[source]
        source: sitegate_web::WebError,
    },

    #[error("Teardown failed: {0}")]
    Teardown(#[from] sitegate_web::WebError),

    #[error("{message}: {reason}", message = .step.failure_message())]
    RunnerSetup { step: SetupStep, reason: String },

    #[error("Runner crashed: {0}")]
    RunnerCrashed(String),

    #[error("{failed} test(s) failed")]
    TestsFailed { failed: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
