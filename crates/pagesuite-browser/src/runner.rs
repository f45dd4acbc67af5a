//! Running embedded-harness test pages against a shared session

use crate::error::{Result, SuiteError};
use crate::session::{is_true, RemoteSession};
use pagesuite_core::{
    HarnessConfig, RunPolicy, RunSummary, SuiteOutcome, TargetResult, TestTarget, Verdict,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives one session through a sequence of test pages
///
/// The session is shared by every target and used strictly one target at a
/// time, in the order the targets are given.
pub struct PageSuiteRunner<S> {
    session: S,
    harness: HarnessConfig,
}

impl<S: RemoteSession> PageSuiteRunner<S> {
    pub fn new(session: S, harness: HarnessConfig) -> Self {
        Self { session, harness }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Give the session back, e.g. to close it
    pub fn into_session(self) -> S {
        self.session
    }

    /// Load one page and collect what its harness reports
    ///
    /// Fails with `Timeout` if the harness does not finish within the
    /// target's budget; no outcome is produced in that case. A failing
    /// suite is not an error: it comes back as an outcome carrying the
    /// page's report.
    pub async fn run_suite(&self, target: &TestTarget) -> Result<SuiteOutcome> {
        info!("Running {}", target);

        self.session.open(target.url().as_str()).await?;

        self.session
            .wait_for_condition(&self.harness.finished, target.timeout())
            .await
            .map_err(|e| match e {
                SuiteError::Timeout { waited_ms, .. } => SuiteError::Timeout {
                    subject: format!("{} to finish", target.name()),
                    waited_ms,
                },
                other => other,
            })?;

        let success = self.session.eval_script(&self.harness.success).await?;
        debug!("{} success flag: {}", target.name(), success);

        if is_true(&success) {
            return Ok(SuiteOutcome::passed());
        }

        let report = self.session.eval_script(&self.harness.report).await?;
        Ok(SuiteOutcome::failed(report))
    }

    /// Run every target in order and collect a verdict for each
    ///
    /// Errors never abort the sweep early unless `policy` says so, except
    /// for session loss, after which the remaining targets are skipped.
    pub async fn run_all(
        &self,
        profile: &str,
        targets: &[TestTarget],
        policy: RunPolicy,
    ) -> RunSummary {
        let mut summary = RunSummary::new(profile);
        let mut stop_reason: Option<String> = None;

        for target in targets {
            if let Some(reason) = &stop_reason {
                summary.record(TargetResult::skipped(target, reason.clone()));
                continue;
            }

            let started = Instant::now();
            let verdict = match self.run_suite(target).await {
                Ok(outcome) => {
                    if outcome.success() {
                        info!("PASS {}", target.name());
                    } else {
                        info!("FAIL {}", target.name());
                    }
                    Verdict::from_outcome(&outcome)
                }
                Err(e) => {
                    warn!("ERROR {}: {}", target.name(), e);
                    if e.is_fatal() {
                        stop_reason = Some(format!("session lost while running {}", target.name()));
                    } else if !policy.continue_on_error {
                        stop_reason = Some(format!("run stopped after {} errored", target.name()));
                    }
                    Verdict::from_error(&e)
                }
            };

            summary.record(TargetResult::new(target, started.elapsed(), verdict));
        }

        info!("{}", summary.summary());
        summary
    }
}
