//! The snapshot run, from target to bundle.
//!
//! A run moves through the [`Stage`]s in order. Opening the session,
//! loading the page and writing the bundle are fatal when they fail;
//! everything in between degrades and the run carries on. Whatever happens,
//! an opened session is closed exactly once before the run reports back.

use crate::bundle::{Bundle, BundleWriter};
use crate::discover::discover_assets;
use crate::error::{ErrorKind, Result};
use crate::fetch::{AssetClient, AssetFetcher, AssetIndex, AssetSummary};
use crate::rewrite::{rewrite_markup, rewrite_stylesheet};
use crate::sanitize::sanitize;
use crate::styles::extract_styles;
use crate::target::Target;
use derive_more::Display;
use exn::ResultExt;
use serde_json::Value;
use sitesnap_browser::{BrowserSession, Launcher};
use sitesnap_config::Config;
use sitesnap_storage::StorageBackend;
use sitesnap_storage::backend::LocalBackend;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;
use url::Url;

/// Progress of a run. Later stages compare greater than earlier ones.
///
/// Closing the session isn't a stage of its own: it happens on every path,
/// after whichever stage the run got to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Idle,
    SessionOpen,
    PageLoaded,
    StyleExtracted,
    AssetsFetched,
    ReferencesRewritten,
    Sanitized,
    Persisted,
}

/// What a run reports back. Always populated, whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub success: bool,
    /// Final markup as written to `index.html`; on failure, whatever the run
    /// had produced so far.
    pub html: String,
    /// Final stylesheet as written to `styles.css`.
    pub css: String,
    pub output_dir: PathBuf,
    pub error: Option<String>,
    /// Furthest stage reached before the session was closed.
    pub stage: Stage,
    pub assets: AssetSummary,
    pub captured_at: UtcDateTime,
}
impl RunResult {
    fn failed(output_dir: PathBuf, error: &ErrorKind, captured_at: UtcDateTime) -> Self {
        tracing::error!(error = %error, "Snapshot failed");
        Self {
            success: false,
            html: String::new(),
            css: String::new(),
            output_dir,
            error: Some(error.to_string()),
            stage: Stage::Idle,
            assets: AssetSummary::default(),
            captured_at,
        }
    }
}

/// Per-run state. Nothing here outlives the run.
struct Run<'a> {
    target: &'a Target,
    stage: Stage,
    html: String,
    css: String,
    index: AssetIndex,
    assets: AssetSummary,
}
impl<'a> Run<'a> {
    fn new(target: &'a Target) -> Self {
        Self {
            target,
            stage: Stage::Idle,
            html: String::new(),
            css: String::new(),
            index: AssetIndex::default(),
            assets: AssetSummary::default(),
        }
    }

    fn advance(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "Stage reached");
        self.stage = stage;
    }

    fn finish(self, outcome: Result<()>, captured_at: UtcDateTime) -> RunResult {
        let error = match outcome {
            Ok(()) => {
                tracing::debug!(
                    fetched = self.assets.fetched,
                    failed = self.assets.failed,
                    html = self.html.len(),
                    css = self.css.len(),
                    "Snapshot complete"
                );
                None
            },
            Err(e) => {
                tracing::error!(stage = %self.stage, error = ?e, "Snapshot failed");
                Some((*e).to_string())
            },
        };
        RunResult {
            success: error.is_none(),
            html: self.html,
            css: self.css,
            output_dir: self.target.output_dir().to_path_buf(),
            error,
            stage: self.stage,
            assets: self.assets,
            captured_at,
        }
    }
}

/// Takes snapshots through a rendering [`Launcher`] and an [`AssetClient`].
pub struct Replicator {
    launcher: Box<dyn Launcher>,
    client: Box<dyn AssetClient>,
    config: Config,
}
impl Replicator {
    pub fn new(launcher: impl Launcher + 'static, client: impl AssetClient + 'static, config: Config) -> Self {
        Self { launcher: Box::new(launcher), client: Box::new(client), config }
    }

    /// Drive a local Chrome/Chromium and download assets over HTTP, both as
    /// configured.
    #[cfg(feature = "cdp")]
    pub fn chrome(config: Config) -> Result<Self> {
        use crate::fetch::HttpClient;
        use sitesnap_browser::{Chrome, ChromeLauncher};

        let chrome = match Chrome::resolve(config.browser.chrome.as_deref()) {
            Ok(chrome) => chrome,
            Err(e) => {
                let reason = (*e).to_string();
                return Err::<Self, _>(e).or_raise(|| ErrorKind::Launch(reason));
            },
        };
        let launcher = ChromeLauncher::new(chrome).headless(config.browser.headless).settle(config.browser.settle());
        let client = HttpClient::new(&config.fetch).or_raise(|| ErrorKind::Client)?;
        Ok(Self::new(launcher, client, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Capture `target` into `output_dir` (or the configured snapshots root).
    ///
    /// Never fails: every problem, including an unusable target, ends up in
    /// [`RunResult::error`].
    pub async fn replicate(&self, target: &str, output_dir: Option<&Path>, sanitize: bool) -> RunResult {
        let captured_at = UtcDateTime::now();
        let requested = || output_dir.map(Path::to_path_buf).unwrap_or_default();
        let target = match Target::new(target, output_dir, &self.config.output.snapshots_root, sanitize) {
            Ok(target) => target,
            Err(e) => return RunResult::failed(requested(), &*e, captured_at),
        };
        let backend = match LocalBackend::new("bundle", target.output_dir()) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::debug!(error = ?e, "Output directory unusable");
                let kind = ErrorKind::Persist(target.output_dir().to_path_buf());
                return RunResult::failed(target.output_dir().to_path_buf(), &kind, captured_at);
            },
        };
        self.replicate_into(&target, &backend).await
    }

    /// Capture `target`, writing the bundle through `backend`.
    #[instrument(skip_all, fields(url = %target.url(), output = %target.output_dir().display(), sanitize = target.sanitize()))]
    pub async fn replicate_into(&self, target: &Target, backend: &dyn StorageBackend) -> RunResult {
        let captured_at = UtcDateTime::now();
        let mut run = Run::new(target);
        let outcome = match self.launcher.open().await {
            Ok(session) => {
                run.advance(Stage::SessionOpen);
                let outcome = self.capture(&mut run, session.as_ref(), backend).await;
                if let Err(e) = session.close().await {
                    tracing::warn!(error = %*e, "Failed to close rendering session");
                }
                tracing::debug!(stage = %run.stage, "Rendering session closed");
                outcome
            },
            Err(e) => {
                let reason = (*e).to_string();
                Err::<(), _>(e).or_raise(|| ErrorKind::Launch(reason))
            },
        };
        run.finish(outcome, captured_at)
    }

    async fn capture(&self, run: &mut Run<'_>, session: &dyn BrowserSession, backend: &dyn StorageBackend) -> Result<()> {
        self.prepare_session(session).await;
        let target = run.target;
        let url = target.url().as_str();
        let browser = &self.config.browser;
        if let Err(e) = session.navigate(url, browser.navigation_timeout(), browser.wait_until).await {
            let reason = (*e).to_string();
            return Err::<(), _>(e).or_raise(|| ErrorKind::Navigation { url: url.to_string(), reason });
        }
        run.html = match session.content().await {
            Ok(html) => html,
            Err(e) => {
                let reason = (*e).to_string();
                return Err::<(), _>(e).or_raise(|| ErrorKind::Markup(reason));
            },
        };
        run.advance(Stage::PageLoaded);

        run.css = extract_styles(session).await;
        run.advance(Stage::StyleExtracted);

        let base = page_base(session, target.url()).await;
        let candidates = discover_assets(session).await;
        let writer = BundleWriter::new(backend, target.output_dir());
        writer.prepare().await?;
        let fetcher = AssetFetcher::new(self.client.as_ref(), backend, self.config.fetch.concurrency);
        run.assets = fetcher.fetch_all(&candidates, &base, &mut run.index).await;
        if run.assets.failed > 0 {
            tracing::warn!(failed = run.assets.failed, fetched = run.assets.fetched, "Some assets were not downloaded");
        }
        run.advance(Stage::AssetsFetched);

        run.html = rewrite_markup(&run.html, &base, &run.index);
        run.css = rewrite_stylesheet(&run.css, &base, &run.index);
        run.advance(Stage::ReferencesRewritten);

        if target.sanitize() {
            run.html = sanitize(&run.html);
            run.advance(Stage::Sanitized);
        }

        let bundle = Bundle { html: run.html.clone(), css: run.css.clone() };
        run.html = writer.write(&bundle).await?;
        run.advance(Stage::Persisted);
        Ok(())
    }

    /// Viewport, user agent and script toggle. Failures are not fatal: the
    /// page still loads, just not quite as configured.
    async fn prepare_session(&self, session: &dyn BrowserSession) {
        let browser = &self.config.browser;
        if let Err(e) = session.set_viewport(browser.viewport).await {
            tracing::warn!(error = %*e, "Could not set viewport");
        }
        if let Some(user_agent) = &browser.user_agent
            && let Err(e) = session.set_user_agent(user_agent).await
        {
            tracing::warn!(error = %*e, "Could not set user agent");
        }
        if let Err(e) = session.set_javascript_enabled(browser.javascript).await {
            tracing::warn!(error = %*e, "Could not toggle JavaScript");
        }
    }
}

/// The URL relative references on the loaded page resolve against. Follows
/// redirects and `<base href>`; falls back to the requested URL.
async fn page_base(session: &dyn BrowserSession, requested: &Url) -> Url {
    match session.evaluate("document.baseURI").await {
        Ok(Value::String(base)) => Url::parse(&base)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or_else(|| requested.clone()),
        _ => requested.clone(),
    }
}

/// Capture `target` with a local Chrome/Chromium, using configuration from
/// the default locations.
#[cfg(feature = "cdp")]
pub async fn replicate(target: &str, output_dir: Option<&Path>, sanitize: bool) -> RunResult {
    let replicator = Config::load(None)
        .map_err(|e| exn::Exn::from(ErrorKind::Config((*e).to_string())))
        .and_then(Replicator::chrome);
    match replicator {
        Ok(replicator) => replicator.replicate(target, output_dir, sanitize).await,
        Err(e) => RunResult::failed(output_dir.map(Path::to_path_buf).unwrap_or_default(), &*e, UtcDateTime::now()),
    }
}
