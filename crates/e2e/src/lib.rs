//! Sitegate E2E
//!
//! Runs end-to-end tests at three points of a site's build lifecycle and
//! turns the outcome into build host signals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  pre_build / post_build / on_success                        │
//! │    ├── ProcessHandle   start command, stopped on teardown   │
//! │    ├── Pinger          wait until a URL answers             │
//! │    ├── StaticServer    serve the publish folder             │
//! │    ├── TestRunner      run the tests (Cypress)              │
//! │    └── interpret()     verdict -> BuildHost callbacks       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cypress;
pub mod error;
pub mod host;
pub mod orchestrator;
pub mod ping;
pub mod process;
pub mod report;
pub mod runner;

pub use cypress::CypressRunner;
pub use error::{E2eError, E2eResult};
pub use host::BuildHost;
pub use orchestrator::{Orchestrator, PhaseOutcome};
pub use ping::{
    ErrorClass, HttpProbe, Pinger, PollOutcome, PollRequest, Probe, ProbeError, RetryPolicy,
};
pub use process::ProcessHandle;
pub use report::{interpret, StatusSummary, Verdict};
pub use runner::{RunRequest, SetupStep, TestRunner};
pub use sitegate_web::DEFAULT_PORT;
