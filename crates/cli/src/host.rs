//! Console build host
//!
//! Prints what the phases report and remembers failures so the binary can
//! turn them into an exit status.

use parking_lot::Mutex;

use sitegate_e2e::{BuildHost, E2eError, StatusSummary};

use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Build,
    Plugin,
}

/// A failure reported through the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFailure {
    pub kind: FailureKind,
    pub message: String,
    pub detail: String,
}

pub struct ConsoleHost {
    format: OutputFormat,
    failures: Mutex<Vec<RecordedFailure>>,
    summaries: Mutex<Vec<StatusSummary>>,
}

impl ConsoleHost {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            failures: Mutex::new(Vec::new()),
            summaries: Mutex::new(Vec::new()),
        }
    }

    pub fn failures(&self) -> Vec<RecordedFailure> {
        self.failures.lock().clone()
    }

    pub fn summaries(&self) -> Vec<StatusSummary> {
        self.summaries.lock().clone()
    }

    pub fn build_failed(&self) -> bool {
        self.failures
            .lock()
            .iter()
            .any(|f| f.kind == FailureKind::Build)
    }

    /// 1 once anything failed, build or plugin
    pub fn exit_code(&self) -> i32 {
        if self.failures.lock().is_empty() {
            0
        } else {
            1
        }
    }

    fn record(&self, kind: FailureKind, message: &str, error: &E2eError) {
        self.failures.lock().push(RecordedFailure {
            kind,
            message: message.to_string(),
            detail: error.to_string(),
        });
    }
}

impl BuildHost for ConsoleHost {
    fn fail_build(&self, message: &str, error: &E2eError) {
        output::print_error(message);
        output::print_detail(&error.to_string());
        self.record(FailureKind::Build, message, error);
    }

    fn fail_plugin(&self, message: &str, error: &E2eError) {
        output::print_warning(message);
        output::print_detail(&error.to_string());
        self.record(FailureKind::Plugin, message, error);
    }

    fn show_status(&self, summary: &StatusSummary) {
        output::print_status(summary, self.format);
        self.summaries.lock().push(summary.clone());
    }
}
