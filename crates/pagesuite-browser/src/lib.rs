//! Remote browser sessions and the page suite runner
//!
//! This crate drives a browser through HTML test pages that carry their own
//! test harness (Closure's `G_testRunner` by default). For each page it
//! navigates, waits until the harness reports that it has finished, and reads
//! back whether every assertion passed.
//!
//! # Example
//!
//! ```no_run
//! use pagesuite_browser::{BrowserConfig, BrowserSession, PageSuiteRunner};
//! use pagesuite_core::{HarnessConfig, TestTarget};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = BrowserSession::start(BrowserConfig::default()).await?;
//!     let runner = PageSuiteRunner::new(session, HarnessConfig::default());
//!
//!     let target = TestTarget::resolve(
//!         "model",
//!         None,
//!         "http://localhost:8080/kemia/model/model_test.html",
//!         5000,
//!     )?;
//!
//!     let outcome = runner.run_suite(&target).await?;
//!     if !outcome.success() {
//!         eprintln!("{}", outcome.report().unwrap_or_default());
//!     }
//!
//!     runner.into_session().close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed for the launch backend
//! - For connecting to an existing browser: `chrome --remote-debugging-port=9222`
//!
//! # Architecture
//!
//! - [`session`]: the `RemoteSession` trait the runner is written against
//! - [`wait`]: polling until a remote condition holds
//! - [`browser`]: `headless_chrome`-backed session
//! - [`runner`]: one page (`run_suite`) or a whole profile (`run_all`)
//! - [`error`]: error types for session operations

pub mod browser;
pub mod error;
pub mod runner;
pub mod session;
pub mod wait;

// Re-export commonly used types
pub use browser::{BrowserConfig, BrowserSession};
pub use error::{Result, SuiteError};
pub use runner::PageSuiteRunner;
pub use session::RemoteSession;
pub use wait::poll_until;
