//! Polling until a remote condition holds

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Interval between completion checks when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Repeatedly run `check` until it returns `true` or `timeout` elapses
///
/// Returns `Ok(true)` once the condition holds and `Ok(false)` when the budget
/// runs out. The condition is checked one last time at the deadline, so a
/// `false` result is only ever returned at or after `timeout`. Errors from
/// `check` are returned immediately.
///
/// Each check is bounded by the time left, or by one `interval` for the check
/// at the deadline. A check still running when its bound expires is dropped
/// and counts as not met.
///
/// # Example
/// ```
/// use pagesuite_browser::wait::poll_until;
/// use pagesuite_browser::SuiteError;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let met = poll_until(Duration::from_millis(50), Duration::from_millis(10), || async {
///         Ok::<_, SuiteError>(true)
///     })
///     .await
///     .unwrap();
///     assert!(met);
/// }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut check: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let deadline = start + timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;
        let bound = deadline
            .saturating_duration_since(Instant::now())
            .max(interval.min(timeout));

        match tokio::time::timeout(bound, check()).await {
            Ok(met) => {
                if met? {
                    debug!("Condition met after {} polls ({:?})", polls, start.elapsed());
                    return Ok(true);
                }
            }
            Err(_) => {
                debug!("Check {} still running after {:?}, giving up", polls, bound);
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!("Condition not met after {} polls ({:?})", polls, elapsed);
            return Ok(false);
        }

        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}
