//! Integration tests for the page suite runner
//!
//! Tests the full run protocol against a scripted in-memory session:
//! - Completion polling with real timing
//! - Success / failure / report handling
//! - Error taxonomy and what it does to the rest of a run

use async_trait::async_trait;
use pagesuite_browser::{PageSuiteRunner, RemoteSession, Result, SuiteError};
use pagesuite_core::{HarnessConfig, RunPolicy, TestTarget, Verdict};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How a scripted page behaves once opened
#[derive(Clone)]
enum Page {
    /// Harness finishes `after` the page is opened
    Finishes {
        after: Duration,
        success: bool,
        report: &'static str,
    },
    /// Harness never finishes
    Hangs,
    /// Page main thread is stuck: every completion check blocks for `STUCK_CHECK`
    Stuck,
    /// Navigation fails
    Unreachable,
    /// Browser dies when this page is opened
    KillsBrowser,
}

/// How long a completion check on a stuck page takes to answer
const STUCK_CHECK: Duration = Duration::from_millis(3000);

#[derive(Default)]
struct State {
    current: Option<(String, Instant)>,
    dead: bool,
    opened: Vec<String>,
    report_reads: usize,
}

/// In-memory session serving scripted pages by URL
struct ScriptedSession {
    pages: HashMap<String, Page>,
    state: Mutex<State>,
}

impl ScriptedSession {
    fn new(pages: &[(&str, Page)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(name, page)| (url_for(name), page.clone()))
                .collect(),
            state: Mutex::new(State::default()),
        }
    }

    fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    fn report_reads(&self) -> usize {
        self.state.lock().unwrap().report_reads
    }

    fn current_page_is_stuck(&self) -> bool {
        let state = self.state.lock().unwrap();
        matches!(
            state.current.as_ref().and_then(|(url, _)| self.pages.get(url)),
            Some(Page::Stuck)
        )
    }
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn open(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.dead {
            return Err(SuiteError::SessionUnavailable("browser exited".to_string()));
        }
        state.opened.push(url.to_string());

        match self.pages.get(url) {
            Some(Page::Unreachable) | None => Err(SuiteError::NavigationFailure {
                url: url.to_string(),
                reason: "net::ERR_FILE_NOT_FOUND".to_string(),
            }),
            Some(Page::KillsBrowser) => {
                state.dead = true;
                Err(SuiteError::SessionUnavailable("browser exited".to_string()))
            }
            Some(_) => {
                state.current = Some((url.to_string(), Instant::now()));
                Ok(())
            }
        }
    }

    async fn eval_script(&self, expression: &str) -> Result<String> {
        if expression.contains("isFinished") && self.current_page_is_stuck() {
            tokio::time::sleep(STUCK_CHECK).await;
            return Ok("false".to_string());
        }

        let mut state = self.state.lock().unwrap();
        if state.dead {
            return Err(SuiteError::SessionUnavailable("browser exited".to_string()));
        }
        let (url, opened_at) = state
            .current
            .clone()
            .ok_or_else(|| SuiteError::Script("no page loaded".to_string()))?;

        let value = match self.pages.get(&url) {
            Some(Page::Finishes {
                after,
                success,
                report,
            }) => {
                if expression.contains("isFinished") {
                    (opened_at.elapsed() >= *after).to_string()
                } else if expression.contains("isSuccess") {
                    success.to_string()
                } else if expression.contains("getReport") {
                    state.report_reads += 1;
                    report.to_string()
                } else {
                    "undefined".to_string()
                }
            }
            _ => {
                if expression.contains("isFinished") {
                    "false".to_string()
                } else {
                    "undefined".to_string()
                }
            }
        };
        Ok(value)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(20)
    }
}

fn url_for(name: &str) -> String {
    format!("http://localhost:8080/kemia/{}_test.html", name)
}

fn target(name: &str, timeout_ms: u64) -> TestTarget {
    TestTarget::resolve(name, None, &url_for(name), timeout_ms).unwrap()
}

fn runner(pages: &[(&str, Page)]) -> PageSuiteRunner<ScriptedSession> {
    PageSuiteRunner::new(ScriptedSession::new(pages), HarnessConfig::default())
}

fn passing_after(ms: u64) -> Page {
    Page::Finishes {
        after: Duration::from_millis(ms),
        success: true,
        report: "",
    }
}

#[tokio::test]
async fn test_page_finishing_after_200ms_passes() {
    let runner = runner(&[("model", passing_after(200))]);

    let start = Instant::now();
    let outcome = runner.run_suite(&target("model", 5000)).await.unwrap();
    let elapsed = start.elapsed();

    assert!(outcome.success());
    assert_eq!(outcome.report(), None);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
    assert_eq!(runner.session().report_reads(), 0);
}

#[tokio::test]
async fn test_page_that_never_finishes_times_out() {
    let runner = runner(&[("sssr", Page::Hangs)]);

    let start = Instant::now();
    let err = runner.run_suite(&target("sssr", 1000)).await.unwrap_err();

    assert!(start.elapsed() >= Duration::from_millis(1000));
    match err {
        SuiteError::Timeout { subject, waited_ms } => {
            assert_eq!(subject, "sssr to finish");
            assert_eq!(waited_ms, 1000);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stuck_page_times_out_within_budget() {
    let runner = runner(&[("sssr", Page::Stuck)]);

    let start = Instant::now();
    let err = runner.run_suite(&target("sssr", 1000)).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(1000));
    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);
    assert!(matches!(err, SuiteError::Timeout { waited_ms: 1000, .. }));
}

#[tokio::test]
async fn test_failing_page_returns_its_report() {
    let runner = runner(&[(
        "smiles",
        Page::Finishes {
            after: Duration::ZERO,
            success: false,
            report: "3 of 10 assertions failed",
        },
    )]);

    let outcome = runner.run_suite(&target("smiles", 5000)).await.unwrap();
    assert!(!outcome.success());
    assert_eq!(outcome.report(), Some("3 of 10 assertions failed"));
    assert_eq!(runner.session().report_reads(), 1);
}

#[tokio::test]
async fn test_unreachable_page_is_navigation_failure() {
    let runner = runner(&[("mdl", Page::Unreachable)]);
    let err = runner.run_suite(&target("mdl", 5000)).await.unwrap_err();
    assert!(matches!(err, SuiteError::NavigationFailure { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_same_page_in_two_sessions_agrees() {
    let pages = [(
        "json",
        Page::Finishes {
            after: Duration::from_millis(30),
            success: false,
            report: "testRoundTrip failed",
        },
    )];

    let first = runner(&pages).run_suite(&target("json", 2000)).await.unwrap();
    let second = runner(&pages).run_suite(&target("json", 2000)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_errors_do_not_stop_later_targets() {
    let runner = runner(&[
        ("hanser", Page::Hangs),
        ("mdl", Page::Unreachable),
        ("line", passing_after(0)),
    ]);
    let targets = [target("hanser", 100), target("mdl", 100), target("line", 1000)];

    let summary = runner.run_all("default", &targets, RunPolicy::default()).await;

    assert_eq!(summary.errored_count(), 2);
    assert_eq!(summary.passed_count(), 1);
    assert!(matches!(&summary.results[0].verdict, Verdict::Errored { kind, .. } if kind == "timeout"));
    assert!(matches!(&summary.results[1].verdict, Verdict::Errored { kind, .. } if kind == "navigation-failure"));
    assert_eq!(summary.results[2].verdict, Verdict::Passed);
    assert_eq!(summary.exit_code(), 2);
}

#[tokio::test]
async fn test_fail_fast_policy_skips_after_error() {
    let runner = runner(&[("hanser", Page::Unreachable), ("line", passing_after(0))]);
    let targets = [target("hanser", 100), target("line", 1000)];

    let summary = runner
        .run_all(
            "ci",
            &targets,
            RunPolicy {
                continue_on_error: false,
            },
        )
        .await;

    assert_eq!(summary.errored_count(), 1);
    assert_eq!(summary.skipped_count(), 1);
    assert_eq!(runner.session().opened(), vec![url_for("hanser")]);
}

#[tokio::test]
async fn test_assertion_failures_never_stop_the_run() {
    let failing = Page::Finishes {
        after: Duration::ZERO,
        success: false,
        report: "boom",
    };
    let runner = runner(&[("query", failing), ("symmetry", passing_after(0))]);
    let targets = [target("query", 1000), target("symmetry", 1000)];

    let summary = runner
        .run_all(
            "ci",
            &targets,
            RunPolicy {
                continue_on_error: false,
            },
        )
        .await;

    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.passed_count(), 1);
    assert_eq!(summary.exit_code(), 1);
}

#[tokio::test]
async fn test_session_loss_skips_remaining_targets() {
    let runner = runner(&[
        ("plugin", passing_after(0)),
        ("reaction_editor", Page::KillsBrowser),
        ("affine_transform", passing_after(0)),
        ("qsmiles", passing_after(0)),
    ]);
    let targets = [
        target("plugin", 1000),
        target("reaction_editor", 1000),
        target("affine_transform", 1000),
        target("qsmiles", 1000),
    ];

    let summary = runner.run_all("chrome", &targets, RunPolicy::default()).await;

    assert_eq!(summary.results[0].verdict, Verdict::Passed);
    assert!(matches!(
        &summary.results[1].verdict,
        Verdict::Errored { kind, .. } if kind == "session-unavailable"
    ));
    assert_eq!(summary.skipped_count(), 2);
    assert!(matches!(
        &summary.results[3].verdict,
        Verdict::Skipped { reason } if reason.contains("reaction_editor")
    ));
    assert_eq!(
        runner.session().opened(),
        vec![url_for("plugin"), url_for("reaction_editor")]
    );
}

#[tokio::test]
async fn test_session_reusable_after_timeout() {
    let runner = runner(&[("neighbor_list", Page::Hangs), ("model", passing_after(50))]);

    assert!(runner
        .run_suite(&target("neighbor_list", 100))
        .await
        .is_err());
    let outcome = runner.run_suite(&target("model", 2000)).await.unwrap();
    assert!(outcome.success());
}
