//! Browser lifecycle management using Chrome DevTools Protocol

use crate::error::{Result, SuiteError};
use crate::session::{value_to_string, RemoteSession};
use crate::wait::DEFAULT_POLL_INTERVAL;
use async_trait::async_trait;
use headless_chrome::util::Timeout as DriverTimeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use pagesuite_core::{SessionBackend, SuitePlan};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browsers are killed after this long without a DevTools message
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Prefix of the URL Chrome shows when a page fails to load
const CHROME_ERROR_PREFIX: &str = "chrome-error://";

/// Configuration for a browser session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Launch a local browser or attach to a running one
    pub backend: SessionBackend,
    /// Page load budget
    pub navigation_timeout: Duration,
    /// Interval between completion checks
    pub poll_interval: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            navigation_timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl From<&SuitePlan> for BrowserConfig {
    fn from(plan: &SuitePlan) -> Self {
        Self {
            backend: plan.backend.clone(),
            navigation_timeout: plan.navigation_timeout,
            poll_interval: plan.poll_interval,
        }
    }
}

/// Active browser session with Chrome DevTools Protocol
///
/// One tab, reused for every page of a run.
pub struct BrowserSession {
    browser: Browser,
    tab: Arc<Tab>,
    config: BrowserConfig,
}

impl BrowserSession {
    /// Start a session for the configured backend
    ///
    /// # Example
    /// ```no_run
    /// use pagesuite_browser::browser::{BrowserConfig, BrowserSession};
    /// use pagesuite_browser::session::RemoteSession;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::start(BrowserConfig::default()).await.unwrap();
    ///     session.open("https://example.com").await.unwrap();
    /// }
    /// ```
    pub async fn start(config: BrowserConfig) -> Result<Self> {
        let browser = match &config.backend {
            SessionBackend::Launch {
                headless,
                window_width,
                window_height,
                chrome_path,
                args,
            } => {
                info!(
                    "Launching browser (headless: {}, size: {}x{})",
                    headless, window_width, window_height
                );

                let mut launch_options = LaunchOptions::default_builder()
                    .headless(*headless)
                    .window_size(Some((*window_width, *window_height)))
                    .path(chrome_path.clone())
                    .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
                    .build()
                    .map_err(|e| {
                        SuiteError::SessionUnavailable(format!("Invalid launch options: {}", e))
                    })?;
                launch_options
                    .args
                    .extend(args.iter().map(|arg| OsStr::new(arg.as_str())));

                Browser::new(launch_options).map_err(|e| {
                    SuiteError::SessionUnavailable(format!("Failed to launch browser: {}", e))
                })?
            }
            SessionBackend::Connect { ws_url } => {
                info!("Connecting to existing browser at {}", ws_url);

                Browser::connect_with_timeout(ws_url.clone(), IDLE_BROWSER_TIMEOUT).map_err(
                    |e| {
                        SuiteError::SessionUnavailable(format!(
                            "Failed to connect to browser at {}: {}",
                            ws_url, e
                        ))
                    },
                )?
            }
        };

        let tab = browser
            .new_tab()
            .map_err(|e| SuiteError::SessionUnavailable(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.navigation_timeout);

        info!("Browser session ready");

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Get the current URL
    pub async fn current_url(&self) -> Result<String> {
        self.eval_script("window.location.href").await
    }

    /// Whether the browser still answers DevTools requests
    pub fn is_alive(&self) -> bool {
        self.browser.get_version().is_ok()
    }

    /// Turn a driver error into a session error, or the fallback if the browser is still up
    fn classify(&self, fallback: SuiteError) -> SuiteError {
        if self.is_alive() {
            fallback
        } else {
            SuiteError::SessionUnavailable(format!("browser stopped responding ({})", fallback))
        }
    }

    /// Run a blocking DevTools call on the blocking pool
    ///
    /// The returned future can be dropped by a timeout; the call itself then
    /// finishes in the background on its own cloned tab handle.
    async fn with_tab<T, F>(&self, call: F) -> Result<anyhow::Result<T>>
    where
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || call(&tab))
            .await
            .map_err(|e| SuiteError::Other(format!("DevTools call did not complete: {}", e)))
    }

    /// Close the tab this session opened
    ///
    /// Attached browsers keep running, so the tab has to go explicitly;
    /// launched browsers are killed when the last handle drops.
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        let closed = self
            .with_tab(|tab| tab.close(false))
            .await?
            .map_err(|e| self.classify(SuiteError::Other(format!("Failed to close tab: {}", e))))?;
        if !closed {
            warn!("Browser refused to close the session tab");
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSession for BrowserSession {
    async fn open(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        let navigation_failure = |reason: String| SuiteError::NavigationFailure {
            url: url.to_string(),
            reason,
        };

        let target = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&target)?;
            // Wait for navigation to complete
            tab.wait_until_navigated()?;
            Ok(())
        })
        .await?
        .map_err(|e| self.classify(navigation_failure(e.to_string())))?;

        let landed = self.current_url().await?;
        if landed.starts_with(CHROME_ERROR_PREFIX) {
            return Err(navigation_failure("browser showed an error page".to_string()));
        }

        info!("Loaded {}", url);
        Ok(())
    }

    async fn eval_script(&self, expression: &str) -> Result<String> {
        debug!("Evaluating JavaScript: {}", expression);

        let script = expression.to_string();
        let result = self
            .with_tab(move |tab| tab.evaluate(&script, false))
            .await?
            .map_err(|e| {
                if e.downcast_ref::<DriverTimeout>().is_some() {
                    return SuiteError::Timeout {
                        subject: expression.to_string(),
                        waited_ms: IDLE_BROWSER_TIMEOUT.as_millis() as u64,
                    };
                }
                self.classify(SuiteError::Script(format!("{}: {}", expression, e)))
            })?;

        Ok(result
            .value
            .as_ref()
            .map(value_to_string)
            .unwrap_or_else(|| "undefined".to_string()))
    }

    fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}
