//! # pagesuite-core
//!
//! Core types for pagesuite, a runner for HTML test pages that carry their own
//! embedded test harness.
//!
//! A run loads each page in a remote browser session, waits for the page's
//! harness to report that it has finished, and reads back whether every
//! assertion passed. This crate holds everything that does not need a browser:
//!
//! - [`SuiteError`]: the error taxonomy (infrastructure errors vs. failing suites)
//! - [`SuiteConfig`]: `pagesuite.toml`, profiles and target resolution
//! - [`TestTarget`] / [`SuiteOutcome`]: one page and what its harness reported
//! - [`RunSummary`]: ordered per-target verdicts, console summary and JUnit XML

pub mod config;
mod error;
pub mod report;
mod types;

pub use config::{
    HarnessConfig, ProfileConfig, RunPolicy, SessionBackend, SuiteConfig, SuitePlan,
    TargetConfig, DEFAULT_CONFIG_FILE, DEFAULT_PROFILE,
};
pub use error::{Result, SuiteError};
pub use report::{RunSummary, TargetResult, Verdict};
pub use types::*;
