//! Chrome DevTools Protocol backend using chromiumoxide.

use crate::chrome::Chrome;
use crate::error::{ErrorKind, Result};
use crate::session::{BrowserSession, Launcher, Viewport, WaitCondition};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetScriptExecutionDisabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use exn::ResultExt;
use futures::StreamExt;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::instrument;

/// Granularity of the network idle poll, in milliseconds.
const IDLE_POLL_MS: u128 = 100;

/// Launches one Chrome process per session.
pub struct ChromeLauncher {
    chrome: Chrome,
    headless: bool,
    settle: Duration,
}
impl ChromeLauncher {
    pub fn new(chrome: Chrome) -> Self {
        Self { chrome, headless: true, settle: Duration::from_millis(500) }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// How long the network must stay quiet for [`WaitCondition::NetworkIdle`].
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    #[instrument(skip(self), fields(chrome = %self.chrome.path().display()))]
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        let mut builder = BrowserConfig::builder().chrome_executable(self.chrome.path());
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| exn::Exn::from(ErrorKind::Launch(e)))?;
        let (mut browser, mut handler) =
            Browser::launch(config).await.or_raise(|| ErrorKind::Launch("browser process did not start".into()))?;
        // The handler drives the websocket connection; the browser is dead
        // in the water unless something polls it.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "DevTools connection closed");
                    break;
                }
            }
        });
        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // Don't leak the process we just started.
                if let Err(close) = browser.close().await {
                    tracing::warn!(error = %close, "Failed to close browser after page creation failure");
                }
                events.abort();
                return Err(e).or_raise(|| ErrorKind::Launch("could not open a page".into()));
            },
        };
        tracing::debug!("Browser session opened");
        Ok(Box::new(CdpSession { browser, page, events, settle: self.settle }))
    }
}

/// One Chrome process with a single page.
pub struct CdpSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
    settle: Duration,
}
impl CdpSession {
    async fn evaluate_value(&self, script: impl Into<String>) -> Result<Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| exn::Exn::from(ErrorKind::Evaluation(e)))?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .or_raise(|| ErrorKind::Evaluation("runtime rejected expression".into()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn set_viewport(&self, viewport: Viewport) -> Result<()> {
        let params =
            SetDeviceMetricsOverrideParams::new(i64::from(viewport.width), i64::from(viewport.height), 1.0, false);
        self.page.execute(params).await.or_raise(|| ErrorKind::Command("set viewport"))?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        let params = SetUserAgentOverrideParams::new(user_agent);
        self.page.execute(params).await.or_raise(|| ErrorKind::Command("set user agent"))?;
        Ok(())
    }

    async fn set_javascript_enabled(&self, enabled: bool) -> Result<()> {
        let params = SetScriptExecutionDisabledParams::new(!enabled);
        self.page.execute(params).await.or_raise(|| ErrorKind::Command("toggle javascript"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn navigate(&self, url: &str, timeout: Duration, wait: WaitCondition) -> Result<()> {
        let started = Instant::now();
        let timed_out = || ErrorKind::NavigationTimeout { url: url.to_string(), timeout_ms: timeout.as_millis() };
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Err(_) => exn::bail!(timed_out()),
            Ok(Err(e)) => return Err(e).or_raise(|| ErrorKind::Navigation(url.to_string())),
            Ok(Ok(_)) => tracing::debug!(elapsed_ms = started.elapsed().as_millis(), "Page loaded"),
        }
        if wait == WaitCondition::NetworkIdle {
            let remaining = timeout.saturating_sub(started.elapsed());
            let idle = self.evaluate_value(network_idle_script(self.settle));
            match tokio::time::timeout(remaining, idle).await {
                Err(_) => exn::bail!(timed_out()),
                Ok(result) => {
                    result.or_raise(|| ErrorKind::Navigation(url.to_string()))?;
                },
            }
            tracing::debug!(elapsed_ms = started.elapsed().as_millis(), "Network idle");
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.evaluate_value(script).await
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.or_raise(|| ErrorKind::Content)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let CdpSession { mut browser, events, .. } = *self;
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "Failed waiting for browser process to exit");
        }
        events.abort();
        closed.or_raise(|| ErrorKind::Close)?;
        tracing::debug!("Browser session closed");
        Ok(())
    }
}

/// A promise that resolves once no new resource timing entries have appeared
/// for `settle` and the document has finished loading.
fn network_idle_script(settle: Duration) -> String {
    format!(
        r#"new Promise((resolve) => {{
    const settle = {settle};
    const step = {step};
    let seen = performance.getEntriesByType('resource').length;
    let quiet = 0;
    const tick = () => {{
        const now = performance.getEntriesByType('resource').length;
        quiet = now === seen ? quiet + step : 0;
        seen = now;
        if (quiet >= settle && document.readyState === 'complete') {{
            resolve(true);
        }} else {{
            setTimeout(tick, step);
        }}
    }};
    setTimeout(tick, step);
}})"#,
        settle = settle.as_millis(),
        step = IDLE_POLL_MS,
    )
}
