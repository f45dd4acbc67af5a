//! Core type definitions for page suite runs

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::{Result, SuiteError};

/// Report used when a failing page hands back nothing to show
pub const EMPTY_REPORT_PLACEHOLDER: &str = "page harness reported failure without a report";

/// One page to exercise, with its own wait budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTarget {
    name: String,
    url: Url,
    timeout: Duration,
}

impl TestTarget {
    /// Create a target from an already resolved URL
    pub fn new(name: impl Into<String>, url: Url, timeout: Duration) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SuiteError::InvalidTarget(format!(
                "target for {} has an empty name",
                url
            )));
        }
        if timeout.is_zero() {
            return Err(SuiteError::InvalidTarget(format!(
                "{}: timeout must be positive",
                name
            )));
        }
        Ok(Self { name, url, timeout })
    }

    /// Create a target from a page reference relative to an optional base
    ///
    /// See [`resolve_page`] for the accepted forms of `page`.
    pub fn resolve(
        name: impl Into<String>,
        base: Option<&Url>,
        page: &str,
        timeout_ms: u64,
    ) -> Result<Self> {
        let url = resolve_page(base, page)?;
        Self::new(name, url, Duration::from_millis(timeout_ms))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Display for TestTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Pass/fail result reported by a page's embedded harness
///
/// The report only exists for failing suites; a passing outcome never
/// exposes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OutcomeRecord")]
pub struct SuiteOutcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<String>,
}

/// Serialized shape of a [`SuiteOutcome`], rebuilt through its constructors
#[derive(Deserialize)]
struct OutcomeRecord {
    success: bool,
    #[serde(default)]
    report: Option<String>,
}

impl From<OutcomeRecord> for SuiteOutcome {
    fn from(record: OutcomeRecord) -> Self {
        if record.success {
            Self::passed()
        } else {
            Self::failed(record.report.unwrap_or_default())
        }
    }
}

impl SuiteOutcome {
    pub fn passed() -> Self {
        Self {
            success: true,
            report: None,
        }
    }

    /// A failing outcome; blank reports are replaced with a placeholder
    pub fn failed(report: impl Into<String>) -> Self {
        let report = report.into();
        let report = if report.trim().is_empty() {
            EMPTY_REPORT_PLACEHOLDER.to_string()
        } else {
            report
        };
        Self {
            success: false,
            report: Some(report),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Diagnostic text, only for failing outcomes
    pub fn report(&self) -> Option<&str> {
        if self.success {
            None
        } else {
            self.report.as_deref()
        }
    }
}

/// Parse a base location given either as a URL or as a local directory
///
/// The result always ends in `/` so that page paths join underneath it.
pub fn resolve_base(base: &str) -> Result<Url> {
    let base = base.trim();
    if base.is_empty() {
        return Err(SuiteError::Config("base URL is empty".to_string()));
    }

    if let Some(mut url) = parse_absolute(base) {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        return Ok(url);
    }

    let path = Path::new(base);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_directory_path(&absolute)
        .map_err(|_| SuiteError::Config(format!("cannot use {:?} as a base directory", absolute)))
}

/// Resolve a page reference to an absolute URL
///
/// `page` may be an absolute URL (`http://..`, `file:///..`), a path
/// relative to `base`, or an absolute filesystem path.
pub fn resolve_page(base: Option<&Url>, page: &str) -> Result<Url> {
    let page = page.trim();
    if page.is_empty() {
        return Err(SuiteError::InvalidTarget("page reference is empty".to_string()));
    }

    if let Some(url) = parse_absolute(page) {
        return Ok(url);
    }

    match base {
        Some(base) => base
            .join(page)
            .map_err(|e| SuiteError::InvalidTarget(format!("{}: {}", page, e))),
        None if Path::new(page).is_absolute() => Url::from_file_path(page)
            .map_err(|_| SuiteError::InvalidTarget(format!("{}: not a usable file path", page))),
        None => Err(SuiteError::InvalidTarget(format!(
            "{} is relative but no base URL is configured",
            page
        ))),
    }
}

/// Parse `s` as an absolute URL, rejecting Windows drive letters posing as schemes
fn parse_absolute(s: &str) -> Option<Url> {
    match Url::parse(s) {
        Ok(url) if url.scheme().len() > 1 => Some(url),
        _ => None,
    }
}
