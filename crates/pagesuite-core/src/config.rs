//! Configuration management for pagesuite
//!
//! This module provides the configuration structures for a suite run: where the
//! pages live, which harness expressions to query, the list of pages, and the
//! named profiles that pick a browser backend and a subset of pages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::types::{resolve_base, TestTarget};
use crate::{Result, SuiteError};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pagesuite.toml";

/// Profile used when the configuration declares none
pub const DEFAULT_PROFILE: &str = "default";

/// Suite configuration
///
/// Loaded from `pagesuite.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Base URL or directory that relative page paths resolve against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Wait budget for targets that don't set their own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Profile picked when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Page-global expressions exposed by the embedded harness
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Pages under test, in run order
    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    /// Named run configurations
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Expressions evaluated in the page to query the embedded harness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Truthy once the harness has finished running
    #[serde(default = "default_finished_expr")]
    pub finished: String,

    /// `true` when every assertion passed; only valid once finished
    #[serde(default = "default_success_expr")]
    pub success: String,

    /// Human-readable description of the failures
    #[serde(default = "default_report_expr")]
    pub report: String,
}

/// One page entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,

    /// URL, absolute file path, or path relative to `base_url`
    pub page: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// A named run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Target names to run, in this order; empty means all
    #[serde(default)]
    pub targets: Vec<String>,

    /// Keep going after a target errors (session loss always stops the run)
    #[serde(default = "default_true")]
    pub continue_on_error: bool,

    /// Interval between completion checks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Page load budget
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Overrides every target's wait budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Which browser to drive
    #[serde(default)]
    pub backend: SessionBackend,
}

/// How the remote browser session is obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionBackend {
    /// Launch a local Chrome/Chromium
    Launch {
        #[serde(default = "default_true")]
        headless: bool,
        #[serde(default = "default_window_width")]
        window_width: u32,
        #[serde(default = "default_window_height")]
        window_height: u32,
        /// Browser executable; auto-detected when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chrome_path: Option<PathBuf>,
        /// Extra command-line switches
        #[serde(default)]
        args: Vec<String>,
    },
    /// Attach to a running browser (`chrome --remote-debugging-port=9222`)
    Connect {
        /// DevTools websocket URL, e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`
        ws_url: String,
    },
}

/// What to do when a target errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    pub continue_on_error: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

/// A fully resolved profile, ready to run
#[derive(Debug, Clone)]
pub struct SuitePlan {
    pub profile: String,
    pub backend: SessionBackend,
    pub targets: Vec<TestTarget>,
    pub policy: RunPolicy,
    pub poll_interval: Duration,
    pub navigation_timeout: Duration,
}

// Default value providers
fn default_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

/// Switches the starter profiles launch with; pages load each other over file://
fn starter_args() -> Vec<String> {
    vec!["--allow-file-access-from-files".to_string()]
}

fn default_finished_expr() -> String {
    "window.G_testRunner && window.G_testRunner.isFinished()".to_string()
}

fn default_success_expr() -> String {
    "window.G_testRunner.isSuccess()".to_string()
}

fn default_report_expr() -> String {
    "window.G_testRunner.getReport()".to_string()
}

/// Closure test pages shipped with the kemia checkout
const KEMIA_PAGES: &[(&str, &str)] = &[
    (
        "goog_string",
        "third-party/closure/closure/goog/string/string_test.html",
    ),
    ("plugin", "kemia/controller/plugin_test.html"),
    ("model", "kemia/model/model_test.html"),
    ("query", "kemia/algorithm/query/query_test.html"),
    ("symmetry", "kemia/algorithm/symmetry/symmetry_test.html"),
    ("reaction_editor", "kemia/controller/reaction_editor_test.html"),
    ("affine_transform", "kemia/graphics/affine_transform_test.html"),
    ("qsmiles", "kemia/io/qsmiles/smiles_test.html"),
    ("smiles", "kemia/io/smiles/smiles_parser_test.html"),
    ("json", "kemia/io/json_test.html"),
    ("mdl", "kemia/io/mdl_test.html"),
    ("line", "kemia/math/line_test.html"),
    ("neighbor_list", "kemia/model/neighborlist_test.html"),
    ("hanser", "kemia/ring/hanser_test.html"),
    ("sssr", "kemia/ring/sssr_test.html"),
];

impl SuiteConfig {
    /// Load configuration from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            SuiteError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        debug!(
            "Loaded {} targets and {} profiles from {}",
            config.targets.len(),
            config.profiles.len(),
            path.display()
        );
        Ok(config)
    }

    /// Write this configuration to `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SuiteError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Starter configuration listing the kemia test pages
    ///
    /// Profiles `chrome` (visible window) and `headless` launch a local browser.
    pub fn starter(base_url: Option<&str>) -> Self {
        let targets = KEMIA_PAGES
            .iter()
            .map(|(name, page)| TargetConfig {
                name: name.to_string(),
                page: page.to_string(),
                timeout_ms: None,
            })
            .collect();

        let mut profiles = BTreeMap::new();
        profiles.insert(
            "chrome".to_string(),
            ProfileConfig {
                backend: SessionBackend::Launch {
                    headless: false,
                    window_width: default_window_width(),
                    window_height: default_window_height(),
                    chrome_path: None,
                    args: starter_args(),
                },
                ..ProfileConfig::default()
            },
        );
        profiles.insert(
            "headless".to_string(),
            ProfileConfig {
                backend: SessionBackend::Launch {
                    headless: true,
                    window_width: default_window_width(),
                    window_height: default_window_height(),
                    chrome_path: None,
                    args: starter_args(),
                },
                ..ProfileConfig::default()
            },
        );

        Self {
            base_url: base_url.map(str::to_string),
            default_profile: Some("headless".to_string()),
            targets,
            profiles,
            ..Self::default()
        }
    }

    /// Check target names, budgets and profile references
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(SuiteError::Config(
                "default_timeout_ms must be positive".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(SuiteError::Config(format!(
                    "duplicate target name: {}",
                    target.name
                )));
            }
            if target.timeout_ms == Some(0) {
                return Err(SuiteError::Config(format!(
                    "target {}: timeout_ms must be positive",
                    target.name
                )));
            }
        }

        for (name, profile) in &self.profiles {
            if let Some(unknown) = profile.targets.iter().find(|t| !seen.contains(t.as_str())) {
                return Err(SuiteError::Config(format!(
                    "profile {} references unknown target: {}",
                    name, unknown
                )));
            }
            if profile.poll_interval_ms == 0 || profile.timeout_ms == Some(0) {
                return Err(SuiteError::Config(format!(
                    "profile {}: intervals and timeouts must be positive",
                    name
                )));
            }
        }

        if let Some(default) = &self.default_profile {
            if !self.profiles.contains_key(default) {
                return Err(SuiteError::Config(format!(
                    "default_profile {} is not defined",
                    default
                )));
            }
        }

        Ok(())
    }

    /// Names of the available profiles
    pub fn profile_names(&self) -> Vec<String> {
        if self.profiles.is_empty() {
            vec![DEFAULT_PROFILE.to_string()]
        } else {
            self.profiles.keys().cloned().collect()
        }
    }

    /// Profile picked when the caller does not name one
    pub fn default_profile_name(&self) -> String {
        if let Some(name) = &self.default_profile {
            return name.clone();
        }
        self.profiles
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Look up a profile; an empty profile table yields an implicit default
    pub fn profile(&self, name: &str) -> Result<ProfileConfig> {
        if self.profiles.is_empty() && name == DEFAULT_PROFILE {
            return Ok(ProfileConfig::default());
        }
        self.profiles.get(name).cloned().ok_or_else(|| {
            SuiteError::Config(format!(
                "unknown profile {} (available: {})",
                name,
                self.profile_names().join(", ")
            ))
        })
    }

    /// Resolve a profile into concrete targets
    ///
    /// `only` further narrows the profile's targets, keeping profile order.
    pub fn plan(&self, profile_name: &str, only: &[String]) -> Result<SuitePlan> {
        let profile = self.profile(profile_name)?;
        let base = self.base_url.as_deref().map(resolve_base).transpose()?;

        if let Some(unknown) = only
            .iter()
            .find(|n| !self.targets.iter().any(|t| &t.name == *n))
        {
            return Err(SuiteError::Config(format!("unknown target: {}", unknown)));
        }

        let selected: Vec<&TargetConfig> = if profile.targets.is_empty() {
            self.targets.iter().collect()
        } else {
            profile
                .targets
                .iter()
                .filter_map(|name| self.targets.iter().find(|t| &t.name == name))
                .collect()
        };

        // A filter that matches nothing in the profile would run zero targets and pass
        if let Some(outside) = only
            .iter()
            .find(|n| !selected.iter().any(|t| &t.name == *n))
        {
            return Err(SuiteError::Config(format!(
                "target {} is not part of profile {}",
                outside, profile_name
            )));
        }

        let targets = selected
            .into_iter()
            .filter(|t| only.is_empty() || only.contains(&t.name))
            .map(|t| {
                let timeout_ms = profile
                    .timeout_ms
                    .or(t.timeout_ms)
                    .unwrap_or(self.default_timeout_ms);
                TestTarget::resolve(&t.name, base.as_ref(), &t.page, timeout_ms)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SuitePlan {
            profile: profile_name.to_string(),
            backend: profile.backend,
            targets,
            policy: RunPolicy {
                continue_on_error: profile.continue_on_error,
            },
            poll_interval: Duration::from_millis(profile.poll_interval_ms),
            navigation_timeout: Duration::from_millis(profile.navigation_timeout_ms),
        })
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            default_timeout_ms: default_timeout_ms(),
            default_profile: None,
            harness: HarnessConfig::default(),
            targets: Vec::new(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            finished: default_finished_expr(),
            success: default_success_expr(),
            report: default_report_expr(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            continue_on_error: true,
            poll_interval_ms: default_poll_interval_ms(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            timeout_ms: None,
            backend: SessionBackend::default(),
        }
    }
}

impl Default for SessionBackend {
    fn default() -> Self {
        SessionBackend::Launch {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            chrome_path: None,
            args: Vec::new(),
        }
    }
}
