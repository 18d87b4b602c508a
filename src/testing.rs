//! In-process stand-ins for the rendering session.

use async_trait::async_trait;
use serde_json::Value;
use sitesnap_browser::error::{ErrorKind, Result};
use sitesnap_browser::{BrowserSession, Viewport, WaitCondition};
use std::time::Duration;

/// Answers script evaluations by looking for a marker in the script text.
#[derive(Default)]
pub(crate) struct ScriptedSession {
    answers: Vec<(&'static str, Value)>,
}
impl ScriptedSession {
    /// Answer any script containing `marker` with `value`.
    pub(crate) fn answer(mut self, marker: &'static str, value: Value) -> Self {
        self.answers.push((marker, value));
        self
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn set_viewport(&self, _viewport: Viewport) -> Result<()> {
        Ok(())
    }

    async fn set_user_agent(&self, _user_agent: &str) -> Result<()> {
        Ok(())
    }

    async fn set_javascript_enabled(&self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, _url: &str, _timeout: Duration, _wait: WaitCondition) -> Result<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        match self.answers.iter().find(|(marker, _)| script.contains(marker)) {
            Some((_, value)) => Ok(value.clone()),
            None => exn::bail!(ErrorKind::Evaluation("no scripted answer".into())),
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
