//! The remote session seam between the runner and a browser driver

use crate::error::{Result, SuiteError};
use crate::wait::{poll_until, DEFAULT_POLL_INTERVAL};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A controllable browser exposing navigation and in-page evaluation
///
/// Implementors provide [`open`](RemoteSession::open) and
/// [`eval_script`](RemoteSession::eval_script); the completion wait is built
/// on top of them by polling.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Navigate to `url` and wait for the load to settle
    async fn open(&self, url: &str) -> Result<()>;

    /// Evaluate `expression` in the page and return its string representation
    ///
    /// Strings come back verbatim; any other value as its JSON text
    /// (`true`, `3`, `null`).
    async fn eval_script(&self, expression: &str) -> Result<String>;

    /// Interval between completion checks
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Block until `predicate` is truthy in the page, or fail with `Timeout`
    ///
    /// A predicate that throws counts as not yet true, and so does a check
    /// that fails for any reason short of losing the session (a reload
    /// tearing down the page context, a stuck page). The session is left
    /// usable when the wait times out.
    async fn wait_for_condition(&self, predicate: &str, timeout: Duration) -> Result<()> {
        debug!("Waiting up to {:?} for: {}", timeout, predicate);

        let script = condition_script(predicate);
        let script = script.as_str();
        let met = poll_until(timeout, self.poll_interval(), || async move {
            match self.eval_script(script).await {
                Ok(value) => Ok(is_true(&value)),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    debug!("Completion check failed, still waiting: {}", e);
                    Ok(false)
                }
            }
        })
        .await?;

        if met {
            Ok(())
        } else {
            Err(SuiteError::Timeout {
                subject: predicate.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Wrap a predicate so it evaluates to a plain boolean and never throws
pub fn condition_script(predicate: &str) -> String {
    format!(
        "(function() {{ try {{ return !!({}); }} catch (e) {{ return false; }} }})()",
        predicate
    )
}

/// Whether an evaluated value reads as the boolean `true`
pub fn is_true(value: &str) -> bool {
    value.trim() == "true"
}

/// String representation of an evaluated value
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
