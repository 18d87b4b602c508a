//! The rendering session a snapshot is taken through.
//!
//! A [`Launcher`] opens [`BrowserSession`]s; the session loads exactly one
//! page and exposes the rendered document through script evaluation and
//! markup serialization. Closing a session consumes it, so a session can
//! only ever be released once.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Browser window dimensions, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

/// When navigation counts as finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    /// The document's `load` event has fired.
    Load,
    /// The `load` event has fired and no new network requests were issued
    /// for the session's settle period.
    #[default]
    NetworkIdle,
}

/// A single page loaded in a rendering engine.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn set_viewport(&self, viewport: Viewport) -> Result<()>;

    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()>;

    /// Load `url`, waiting for `wait` to be satisfied. The whole navigation,
    /// including waiting, is bounded by `timeout`; exceeding it is reported
    /// as [`NavigationTimeout`](crate::error::ErrorKind::NavigationTimeout).
    async fn navigate(&self, url: &str, timeout: Duration, wait: WaitCondition) -> Result<()>;

    /// Evaluate a script expression in the page and return its result by
    /// value. Expressions returning a promise are awaited.
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Serialized markup of the current document.
    async fn content(&self) -> Result<String>;

    /// Release the session and everything it holds (page, browser process).
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens rendering sessions.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>>;
}
