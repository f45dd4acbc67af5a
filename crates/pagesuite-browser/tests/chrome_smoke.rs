//! End-to-end tests against a real Chrome/Chromium
//!
//! Ignored by default; run with `cargo test -p pagesuite-browser -- --ignored`
//! on a machine with Chrome installed.

use headless_chrome::{Browser, LaunchOptions};
use pagesuite_browser::{BrowserConfig, BrowserSession, PageSuiteRunner, RemoteSession};
use pagesuite_core::{HarnessConfig, RunPolicy, SessionBackend, SuiteError, TestTarget};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;

/// Page with a stand-in for Closure's G_testRunner
fn write_harness_page(dir: &Path, name: &str, finish_ms: Option<u64>, success: bool) -> Url {
    let finish = match finish_ms {
        Some(ms) => format!("setTimeout(function() {{ finished = true; }}, {});", ms),
        None => String::new(),
    };
    let html = format!(
        r#"<!DOCTYPE html>
<html><head><title>{name}</title>
<script>
  var finished = false;
  window.G_testRunner = {{
    isFinished: function() {{ return finished; }},
    isSuccess: function() {{ return {success}; }},
    getReport: function() {{ return "3 of 10 assertions failed"; }}
  }};
  {finish}
</script>
</head><body></body></html>"#
    );
    let path = dir.join(format!("{}_test.html", name));
    std::fs::write(&path, html).unwrap();
    Url::from_file_path(&path).unwrap()
}

async fn launch() -> PageSuiteRunner<BrowserSession> {
    let session = BrowserSession::start(BrowserConfig::default())
        .await
        .expect("Failed to launch browser");
    PageSuiteRunner::new(session, HarnessConfig::default())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_real_browser_pass_fail_and_timeout() {
    let dir = TempDir::new().unwrap();
    let runner = launch().await;

    let passing = write_harness_page(dir.path(), "model", Some(200), true);
    let failing = write_harness_page(dir.path(), "smiles", Some(0), false);
    let hanging = write_harness_page(dir.path(), "sssr", None, true);

    let outcome = runner
        .run_suite(&TestTarget::new("model", passing, Duration::from_millis(5000)).unwrap())
        .await
        .unwrap();
    assert!(outcome.success());

    let outcome = runner
        .run_suite(&TestTarget::new("smiles", failing, Duration::from_millis(5000)).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome.report(), Some("3 of 10 assertions failed"));

    let err = runner
        .run_suite(&TestTarget::new("sssr", hanging, Duration::from_millis(1000)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::Timeout { .. }));

    // Still usable after the timeout
    assert_eq!(runner.session().eval_script("1 + 2").await.unwrap(), "3");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_real_browser_missing_page() {
    let dir = TempDir::new().unwrap();
    let runner = launch().await;

    let missing = Url::from_file_path(dir.path().join("absent_test.html")).unwrap();
    let targets = [TestTarget::new("absent", missing, Duration::from_millis(1000)).unwrap()];

    let summary = runner.run_all("headless", &targets, RunPolicy::default()).await;
    assert_eq!(summary.errored_count(), 1);
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_real_browser_stuck_page_times_out_on_budget() {
    let dir = TempDir::new().unwrap();
    let runner = launch().await;

    let path = dir.path().join("hanser_test.html");
    std::fs::write(
        &path,
        "<html><script>setTimeout(function() { while (true) {} }, 0);</script></html>",
    )
    .unwrap();
    let stuck = Url::from_file_path(&path).unwrap();

    let start = Instant::now();
    let err = runner
        .run_suite(&TestTarget::new("hanser", stuck, Duration::from_millis(1000)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::Timeout { .. }), "got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_connected_session_closes_its_tab() {
    let dir = TempDir::new().unwrap();
    let host = Browser::new(LaunchOptions::default()).expect("Failed to launch browser");
    let tab_count = || host.get_tabs().lock().unwrap().len();
    let before = tab_count();

    let config = BrowserConfig {
        backend: SessionBackend::Connect {
            ws_url: host.get_ws_url(),
        },
        ..BrowserConfig::default()
    };
    let session = BrowserSession::start(config).await.unwrap();
    let page = write_harness_page(dir.path(), "line", Some(0), true);
    session.open(page.as_str()).await.unwrap();
    session.close().await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while tab_count() > before && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(tab_count(), before);
}
