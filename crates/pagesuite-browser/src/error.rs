//! Browser session error types - re-exports SuiteError from pagesuite-core
//!
//! Session failures map onto the infrastructure variants of SuiteError:
//! - Timeout - the harness never reported completion within the budget
//! - SessionUnavailable - the browser could not be launched, reached, or went away
//! - NavigationFailure - the page could not be loaded
//! - Script - a harness query threw or returned something unusable
//!
//! Error messages should name the page or expression involved.

pub use pagesuite_core::{Result, SuiteError};
