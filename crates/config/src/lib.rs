//! Layered configuration for snapshot runs.
//!
//! Values are merged in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. environment variables prefixed with `SITESNAP_`, nested keys separated
//!    by a double underscore (`SITESNAP_FETCH__CONCURRENCY=4`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use sitesnap_browser::{Viewport, WaitCondition};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "SITESNAP_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub fetch: FetchSettings,
    pub output: OutputSettings,
}

/// How the rendering session is set up and how long navigation may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub viewport: Viewport,
    /// Overrides the browser's own user agent when set.
    pub user_agent: Option<String>,
    pub javascript: bool,
    pub navigation_timeout_ms: u64,
    pub wait_until: WaitCondition,
    /// Quiet period required before the network counts as idle.
    pub settle_ms: u64,
    /// Explicit executable; discovered on `PATH` when unset.
    pub chrome: Option<PathBuf>,
    pub headless: bool,
}
impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            user_agent: None,
            javascript: true,
            navigation_timeout_ms: 30_000,
            wait_until: WaitCondition::NetworkIdle,
            settle_ms: 500,
            chrome: None,
            headless: true,
        }
    }
}
impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Asset downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Maximum number of downloads in flight at once.
    pub concurrency: usize,
    pub timeout_ms: u64,
    pub user_agent: String,
}
impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            concurrency: 16,
            timeout_ms: 20_000,
            user_agent: concat!("sitesnap/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Parent directory for bundles when a run doesn't name its own output
    /// directory. Relative paths resolve against the working directory.
    pub snapshots_root: PathBuf,
}
impl Default for OutputSettings {
    fn default() -> Self {
        Self { snapshots_root: PathBuf::from("snapshots") }
    }
}

impl Config {
    /// Location of the per-user configuration file, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sitesnap").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `file` (or the per-user default file, if it
    /// exists), layered over defaults and under environment overrides.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.clone())),
            };
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Malformed)?;
        config.validate()
    }

    /// Reject values that would make a run impossible.
    pub fn validate(self) -> Result<Self> {
        if self.fetch.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.concurrency"));
        }
        if self.fetch.timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("fetch.timeout_ms"));
        }
        if self.browser.navigation_timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("browser.navigation_timeout_ms"));
        }
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            exn::bail!(ErrorKind::Invalid("browser.viewport"));
        }
        Ok(self)
    }
}
