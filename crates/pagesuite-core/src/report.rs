//! Per-target results and run summaries
//!
//! A run is one pass over a profile's targets against one session. Each
//! target ends with a [`Verdict`]; the [`RunSummary`] collects them in run
//! order and renders a console summary or JUnit XML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{SuiteOutcome, TestTarget, EMPTY_REPORT_PLACEHOLDER};
use crate::{Result, SuiteError};

/// How a single target ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The embedded harness reported success
    Passed,
    /// The embedded harness reported failure
    Failed { report: String },
    /// Infrastructure trouble; no outcome was produced
    Errored { kind: String, message: String },
    /// Not attempted
    Skipped { reason: String },
}

impl Verdict {
    pub fn from_outcome(outcome: &SuiteOutcome) -> Self {
        if outcome.success() {
            Verdict::Passed
        } else {
            Verdict::Failed {
                report: outcome
                    .report()
                    .unwrap_or(EMPTY_REPORT_PLACEHOLDER)
                    .to_string(),
            }
        }
    }

    pub fn from_error(error: &SuiteError) -> Self {
        Verdict::Errored {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASS",
            Verdict::Failed { .. } => "FAIL",
            Verdict::Errored { .. } => "ERROR",
            Verdict::Skipped { .. } => "SKIP",
        }
    }
}

/// Result of one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResult {
    pub name: String,
    pub url: String,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl TargetResult {
    pub fn new(target: &TestTarget, duration: Duration, verdict: Verdict) -> Self {
        Self {
            name: target.name().to_string(),
            url: target.url().to_string(),
            duration_ms: duration.as_millis() as u64,
            verdict,
        }
    }

    pub fn skipped(target: &TestTarget, reason: impl Into<String>) -> Self {
        Self::new(
            target,
            Duration::ZERO,
            Verdict::Skipped {
                reason: reason.into(),
            },
        )
    }
}

/// Ordered results of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub profile: String,
    pub started_at: DateTime<Utc>,
    pub results: Vec<TargetResult>,
}

impl RunSummary {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            started_at: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Summary for a run whose session could not even be obtained
    pub fn session_unavailable(
        profile: impl Into<String>,
        targets: &[TestTarget],
        error: &SuiteError,
    ) -> Self {
        let mut summary = Self::new(profile);
        for target in targets {
            summary.record(TargetResult::new(
                target,
                Duration::ZERO,
                Verdict::from_error(error),
            ));
        }
        summary
    }

    pub fn record(&mut self, result: TargetResult) {
        self.results.push(result);
    }

    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Passed))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Failed { .. }))
    }

    pub fn errored_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Errored { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.verdict)).count()
    }

    pub fn all_passed(&self) -> bool {
        self.passed_count() == self.total_count()
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.results.iter().map(|r| r.duration_ms).sum())
    }

    /// Process exit code: 0 all passed, 1 assertion failures only, 2 infrastructure trouble
    pub fn exit_code(&self) -> i32 {
        if self.errored_count() > 0 || self.skipped_count() > 0 {
            2
        } else if self.failed_count() > 0 {
            1
        } else {
            0
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} errored, {} skipped ({:.2}s)",
            self.profile,
            self.passed_count(),
            self.failed_count(),
            self.errored_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        )
    }

    /// Write JUnit XML to a file
    pub fn write_junit(&self, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }

    /// Render JUnit XML content
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="{}" time="{:.3}" timestamp="{}">"#,
            escape_xml(&self.profile),
            self.total_count(),
            self.failed_count(),
            self.errored_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64(),
            self.started_at.format("%Y-%m-%dT%H:%M:%S")
        ));
        xml.push('\n');

        for result in &self.results {
            xml.push_str(&format!(
                r#"  <testcase name="{}" classname="{}" time="{:.3}">"#,
                escape_xml(&result.name),
                escape_xml(&result.url),
                result.duration_ms as f64 / 1000.0
            ));
            xml.push('\n');

            match &result.verdict {
                Verdict::Passed => {}
                Verdict::Failed { report } => {
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(first_line(report)),
                        escape_xml(report)
                    ));
                    xml.push('\n');
                }
                Verdict::Errored { kind, message } => {
                    xml.push_str(&format!(
                        r#"    <error type="{}" message="{}"/>"#,
                        escape_xml(kind),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
                Verdict::Skipped { reason } => {
                    xml.push_str(&format!(
                        r#"    <skipped message="{}"/>"#,
                        escape_xml(reason)
                    ));
                    xml.push('\n');
                }
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
