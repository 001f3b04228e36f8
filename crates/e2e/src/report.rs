//! Result interpretation - turning a run result into host callbacks

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use sitegate_common::{RunTotals, TestRunResult, PLUGIN_NAME};

use crate::error::E2eError;

/// Failure message when the runner could not run the tests
pub const RUNNER_CRASHED: &str = "Problem running Cypress";

/// Failure message when tests ran and some failed
pub const TESTS_FAILED: &str = "Failed Cypress tests";

/// Informational summary published after every completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub title: String,
    /// One-line tally
    pub summary: String,
    /// Multi-line breakdown, with the dashboard link when recorded
    pub text: String,
}

impl StatusSummary {
    pub fn from_totals(totals: &RunTotals) -> Self {
        let summary = format!(
            "{} passed / {} failed / {} pending / {} skipped",
            totals.passed, totals.failed, totals.pending, totals.skipped
        );

        let mut lines = vec![
            format!("✅ Passed tests: {}", totals.passed),
            format!("🔥 Failed tests: {}", totals.failed),
            format!("⭕️ Pending tests: {}", totals.pending),
            format!("🚫 Skipped tests: {}", totals.skipped),
        ];
        if let Some(url) = &totals.run_url {
            lines.push(format!("🔗 Dashboard url: {}", url));
        }

        Self {
            title: PLUGIN_NAME.to_string(),
            summary,
            text: lines.join("\n"),
        }
    }
}

/// How a phase's run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    TestsFailed { failed: u64 },
    RunnerCrashed { message: String },
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Classify `result` and drive the callbacks
///
/// The summary callback runs exactly once for every completed run, passing or
/// not. The error callback runs only for a crashed runner or failed tests.
pub fn interpret<E, S>(result: &TestRunResult, mut on_error: E, mut on_summary: S) -> Verdict
where
    E: FnMut(&str, &E2eError),
    S: FnMut(&StatusSummary),
{
    let totals = match result {
        TestRunResult::Crashed { message } => {
            error!("{}: {}", RUNNER_CRASHED, message);
            on_error(RUNNER_CRASHED, &E2eError::RunnerCrashed(message.clone()));
            return Verdict::RunnerCrashed {
                message: message.clone(),
            };
        }
        TestRunResult::Completed(totals) => totals,
    };

    debug!(
        "totals passed={} failed={} pending={} skipped={}",
        totals.passed, totals.failed, totals.pending, totals.skipped
    );

    on_summary(&StatusSummary::from_totals(totals));

    if totals.failed > 0 {
        on_error(
            TESTS_FAILED,
            &E2eError::TestsFailed {
                failed: totals.failed,
            },
        );
        return Verdict::TestsFailed {
            failed: totals.failed,
        };
    }

    Verdict::Passed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls {
        errors: Vec<(String, String)>,
        summaries: Vec<StatusSummary>,
    }

    fn run(result: &TestRunResult) -> (Verdict, Calls) {
        let mut errors = Vec::new();
        let mut summaries = Vec::new();
        let verdict = interpret(
            result,
            |msg, err| errors.push((msg.to_string(), err.to_string())),
            |s| summaries.push(s.clone()),
        );
        (verdict, Calls { errors, summaries })
    }

    fn completed(passed: u64, failed: u64) -> TestRunResult {
        TestRunResult::Completed(RunTotals {
            passed,
            failed,
            ..Default::default()
        })
    }

    #[test]
    fn test_all_passed_publishes_summary_only() {
        let (verdict, calls) = run(&completed(10, 0));

        assert_eq!(verdict, Verdict::Passed);
        assert!(calls.errors.is_empty());
        assert_eq!(calls.summaries.len(), 1);
        assert_eq!(
            calls.summaries[0].summary,
            "10 passed / 0 failed / 0 pending / 0 skipped"
        );
        assert_eq!(calls.summaries[0].title, "sitegate");
    }

    #[test]
    fn test_failed_tests_publish_summary_then_error() {
        let (verdict, calls) = run(&completed(8, 2));

        assert_eq!(verdict, Verdict::TestsFailed { failed: 2 });
        assert_eq!(calls.summaries.len(), 1);
        assert_eq!(
            calls.errors,
            vec![("Failed Cypress tests".to_string(), "2 test(s) failed".to_string())]
        );
    }

    #[test]
    fn test_crash_reports_error_without_summary() {
        let (verdict, calls) = run(&TestRunResult::crashed("browser failed to launch"));

        assert!(matches!(verdict, Verdict::RunnerCrashed { .. }));
        assert!(calls.summaries.is_empty());
        assert_eq!(calls.errors.len(), 1);
        assert_eq!(calls.errors[0].0, "Problem running Cypress");
        assert!(calls.errors[0].1.contains("browser failed to launch"));
    }

    #[test]
    fn test_error_callback_iff_failed_or_crashed() {
        let cases = [
            (completed(0, 0), false),
            (completed(3, 0), false),
            (
                TestRunResult::Completed(RunTotals {
                    pending: 4,
                    skipped: 2,
                    ..Default::default()
                }),
                false,
            ),
            (completed(0, 1), true),
            (completed(5, 7), true),
            (TestRunResult::crashed("boom"), true),
        ];

        for (result, expect_error) in cases {
            let (_, calls) = run(&result);
            assert_eq!(!calls.errors.is_empty(), expect_error, "{:?}", result);
            assert!(calls.errors.len() <= 1);
            let expected_summaries = usize::from(!result.is_crashed());
            assert_eq!(calls.summaries.len(), expected_summaries, "{:?}", result);
        }
    }

    #[test]
    fn test_summary_text_includes_dashboard_link() {
        let summary = StatusSummary::from_totals(&RunTotals {
            passed: 1,
            run_url: Some("https://cloud.cypress.io/runs/7".into()),
            ..Default::default()
        });
        assert!(summary.text.contains("Passed tests: 1"));
        assert!(summary.text.ends_with("Dashboard url: https://cloud.cypress.io/runs/7"));

        let without = StatusSummary::from_totals(&RunTotals::default());
        assert!(!without.text.contains("Dashboard"));
    }
}
