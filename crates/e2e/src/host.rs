//! The build host the phases report to

use sitegate_common::Phase;

use crate::error::E2eError;
use crate::report::StatusSummary;

/// Reporting side of the build host
///
/// The host owns the exit code. Phases only ever signal failure through
/// these callbacks.
pub trait BuildHost: Send + Sync {
    /// Mark the build as failed
    fn fail_build(&self, message: &str, error: &E2eError);

    /// Mark the plugin as failed without failing the build
    fn fail_plugin(&self, message: &str, error: &E2eError);

    /// Publish an informational summary
    fn show_status(&self, summary: &StatusSummary);
}

/// Route a failure to the callback `phase` fails through
pub fn report_failure(host: &dyn BuildHost, phase: Phase, message: &str, error: &E2eError) {
    if phase.fails_plugin() {
        host.fail_plugin(message, error);
    } else {
        host.fail_build(message, error);
    }
}
