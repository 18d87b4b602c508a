//! End-to-end runs against an in-process page and asset server.

use async_trait::async_trait;
use serde_json::{Value, json};
use sitesnap::browser::error::{ErrorKind as BrowserErrorKind, Result as BrowserResult};
use sitesnap::browser::{BrowserSession, Launcher, Viewport, WaitCondition};
use sitesnap::config::Config;
use sitesnap::fetch::error::{ErrorKind as FetchErrorKind, Result as FetchResult};
use sitesnap::fetch::{AssetClient, Response};
use sitesnap::{PLACEHOLDER_IMAGE, Replicator, RunResult, Stage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// A rendered page, as the rendering session would report it.
#[derive(Clone, Default)]
struct Page {
    html: &'static str,
    inline_styles: Vec<&'static str>,
    rules: Vec<&'static str>,
    blocked_sheets: usize,
    images: Vec<&'static str>,
    backgrounds: Vec<&'static str>,
    unreachable: bool,
}

#[derive(Default)]
struct Journal {
    opened: AtomicUsize,
    closed: AtomicUsize,
    events: Mutex<Vec<String>>,
}
impl Journal {
    fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn requests(&self) -> Vec<String> {
        self.events().into_iter().filter_map(|e| e.strip_prefix("GET ").map(str::to_string)).collect()
    }
}

struct PageLauncher {
    page: Page,
    journal: Arc<Journal>,
}

#[async_trait]
impl Launcher for PageLauncher {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        self.journal.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PageSession { page: self.page.clone(), journal: self.journal.clone(), url: Mutex::default() }))
    }
}

struct PageSession {
    page: Page,
    journal: Arc<Journal>,
    url: Mutex<String>,
}

#[async_trait]
impl BrowserSession for PageSession {
    async fn set_viewport(&self, _viewport: Viewport) -> BrowserResult<()> {
        Ok(())
    }

    async fn set_user_agent(&self, _user_agent: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn set_javascript_enabled(&self, _enabled: bool) -> BrowserResult<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str, timeout: Duration, _wait: WaitCondition) -> BrowserResult<()> {
        self.journal.push(format!("NAVIGATE {url}"));
        if self.page.unreachable {
            exn::bail!(BrowserErrorKind::NavigationTimeout { url: url.to_string(), timeout_ms: timeout.as_millis() });
        }
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        if script.trim() == "document.baseURI" {
            return Ok(Value::String(self.url.lock().unwrap().clone()));
        }
        if script.contains("styleSheets") {
            return Ok(json!({
                "inline": self.page.inline_styles,
                "rules": self.page.rules,
                "blocked": self.page.blocked_sheets,
            }));
        }
        if script.contains("backgroundImage") {
            return Ok(json!({ "images": self.page.images, "backgrounds": self.page.backgrounds }));
        }
        exn::bail!(BrowserErrorKind::Evaluation("unknown script".into()))
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.page.html.to_string())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.journal.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serves `(status, content type)` per absolute URL; anything else is a
/// connection failure.
struct AssetServer {
    assets: HashMap<&'static str, (u16, &'static str)>,
    journal: Arc<Journal>,
}

#[async_trait]
impl AssetClient for AssetServer {
    async fn get(&self, url: &Url) -> FetchResult<Response> {
        self.journal.push(format!("GET {url}"));
        match self.assets.get(url.as_str()) {
            Some((status, content_type)) => Ok(Response {
                status: *status,
                content_type: Some(content_type.to_string()),
                body: format!("bytes of {url}").into_bytes(),
            }),
            None => exn::bail!(FetchErrorKind::Request),
        }
    }
}

fn replicator(page: Page, assets: &[(&'static str, u16, &'static str)]) -> (Replicator, Arc<Journal>) {
    let journal = Arc::new(Journal::default());
    let launcher = PageLauncher { page, journal: journal.clone() };
    let server = AssetServer {
        assets: assets.iter().map(|(url, status, content_type)| (*url, (*status, *content_type))).collect(),
        journal: journal.clone(),
    };
    (Replicator::new(launcher, server, Config::default()), journal)
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}

fn asset_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("assets"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

const GALLERY: &str = r#"<!DOCTYPE html>
<html><head><title>Gallery</title><style>.hero { background-image: url("/img/hero.jpg"); }</style></head>
<body onload="init()">
<div class="hero"></div>
<img src="/img/one.png" alt="one"><img src="img/two.png" alt="two"><img src="https://cdn.example.net/three.png" alt="three">
<a href="javascript:alert(1)">bad</a><a href="/about">good</a>
<script>document.body.innerHTML += "<img src=/img/four.png>";</script>
</body></html>"#;

fn gallery() -> Page {
    Page {
        html: GALLERY,
        inline_styles: vec![r#".hero { background-image: url("/img/hero.jpg"); }"#],
        rules: vec![".card { background: #fff url(https://example.com/img/one.png) no-repeat; }"],
        images: vec!["/img/one.png", "img/two.png", "https://cdn.example.net/three.png"],
        backgrounds: vec![r#"url("https://example.com/img/hero.jpg")"#],
        ..Page::default()
    }
}

const GALLERY_ASSETS: &[(&str, u16, &str)] = &[
    ("https://example.com/img/one.png", 200, "image/png"),
    ("https://example.com/img/two.png", 200, "image/png"),
    ("https://cdn.example.net/three.png", 404, "text/html"),
    ("https://example.com/img/hero.jpg", 200, "image/jpeg"),
];

#[tokio::test]
async fn captures_a_page_into_a_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, journal) = replicator(gallery(), GALLERY_ASSETS);

    let result = replicator.replicate("example.com", Some(tmp.path()), false).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.error, None);
    assert_eq!(result.stage, Stage::Persisted);
    assert_eq!(result.output_dir, tmp.path());
    assert_eq!(read(tmp.path(), "index.html"), result.html);
    assert_eq!(read(tmp.path(), "styles.css"), result.css);
    assert!(result.html.contains(r#"<link rel="stylesheet" href="styles.css"></head>"#));
    assert_eq!(journal.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn target_is_normalized_before_any_network_access() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, journal) = replicator(gallery(), GALLERY_ASSETS);

    replicator.replicate("  example.com  ", Some(tmp.path()), false).await;

    let events = journal.events();
    assert_eq!(events.first().map(String::as_str), Some("NAVIGATE https://example.com/"));
    assert!(events.iter().skip(1).all(|e| e.starts_with("GET ")));
}

#[tokio::test]
async fn partial_asset_failure_still_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let page = Page { rules: vec![], backgrounds: vec![], inline_styles: vec![], ..gallery() };
    let (replicator, _journal) = replicator(page, GALLERY_ASSETS);

    let result = replicator.replicate("https://example.com", Some(tmp.path()), false).await;

    assert!(result.success);
    assert_eq!(result.assets.fetched, 2);
    assert_eq!(result.assets.failed, 1);
    let files = asset_files(tmp.path());
    assert_eq!(files.len(), 2, "{files:?}");
    assert!(files.iter().any(|f| f.starts_with("one-") && f.ends_with(".png")));
    assert!(files.iter().any(|f| f.starts_with("two-") && f.ends_with(".png")));
    let html = read(tmp.path(), "index.html");
    assert_eq!(html.matches(PLACEHOLDER_IMAGE.as_str()).count(), 1);
    assert_eq!(html.matches(r#"src="./assets/"#).count(), 2);
    assert!(!html.contains("cdn.example.net"));
}

#[tokio::test]
async fn shared_assets_are_fetched_once() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, journal) = replicator(gallery(), GALLERY_ASSETS);

    let result = replicator.replicate("example.com", Some(tmp.path()), false).await;

    let requests = journal.requests();
    // one.png is both an <img> and a stylesheet background.
    assert_eq!(requests.iter().filter(|r| r.as_str() == "https://example.com/img/one.png").count(), 1);
    assert_eq!(requests.iter().filter(|r| r.as_str() == "https://example.com/img/hero.jpg").count(), 1);
    assert_eq!(requests.len(), 4);
    let one = asset_files(tmp.path()).into_iter().find(|f| f.starts_with("one-")).unwrap();
    assert!(result.html.contains(&format!(r#"src="./assets/{one}""#)));
    assert!(result.css.contains(&format!(r#"url("./assets/{one}")"#)));
}

#[tokio::test]
async fn no_remote_references_to_discovered_assets_remain() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, _journal) = replicator(gallery(), GALLERY_ASSETS);

    let result = replicator.replicate("example.com", Some(tmp.path()), false).await;

    for remote in ["https://example.com/img/", "/img/one.png", "/img/hero.jpg", "https://cdn.example.net/three.png"] {
        assert!(!result.css.contains(remote), "stylesheet still references {remote}");
    }
    for remote in ["\"/img/one.png\"", "\"img/two.png\"", "https://cdn.example.net/three.png", "url(\"/img/hero.jpg\")"] {
        assert!(!result.html.contains(remote), "markup still references {remote}");
    }
}

#[tokio::test]
async fn sanitized_bundles_have_no_active_content() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, _journal) = replicator(gallery(), GALLERY_ASSETS);

    let result = replicator.replicate("example.com", Some(tmp.path()), true).await;

    assert!(result.success);
    let html = read(tmp.path(), "index.html");
    assert!(!html.contains("<script"));
    assert!(!html.contains("onload"));
    assert!(!html.to_ascii_lowercase().contains("javascript:"));
    assert!(html.contains(r##"<a href="#">bad</a>"##));
    assert!(html.contains(r#"<a href="/about">good</a>"#));
}

#[tokio::test]
async fn unreadable_stylesheets_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let page = Page {
        html: "<html><head><style>p { margin: 0; }</style></head><body><p>x</p></body></html>",
        inline_styles: vec!["p { margin: 0; }"],
        blocked_sheets: 1,
        ..Page::default()
    };
    let (replicator, _journal) = replicator(page, &[]);

    let result = replicator.replicate("example.com", Some(tmp.path()), false).await;

    assert!(result.success);
    assert_eq!(result.css, "p { margin: 0; }");
    assert_eq!(read(tmp.path(), "styles.css"), "p { margin: 0; }");
}

#[tokio::test]
async fn pages_without_assets() {
    let tmp = tempfile::tempdir().unwrap();
    let page = Page { html: "<html><head></head><body>plain</body></html>", ..Page::default() };
    let (replicator, journal) = replicator(page, &[]);

    let result = replicator.replicate("example.com", Some(tmp.path()), false).await;

    assert!(result.success);
    assert_eq!(result.assets.fetched + result.assets.failed, 0);
    assert!(journal.requests().is_empty());
    assert!(tmp.path().join("assets").is_dir());
    assert!(asset_files(tmp.path()).is_empty());
}

#[tokio::test]
async fn runs_are_idempotent_across_output_directories() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let (replicator, _journal) = replicator(gallery(), GALLERY_ASSETS);

    let a = replicator.replicate("example.com", Some(first.path()), true).await;
    let b = replicator.replicate("example.com", Some(second.path()), true).await;

    assert!(a.success && b.success);
    assert_eq!(read(first.path(), "index.html"), read(second.path(), "index.html"));
    assert_eq!(read(first.path(), "styles.css"), read(second.path(), "styles.css"));
    assert_eq!(asset_files(first.path()), asset_files(second.path()));
}

#[tokio::test]
async fn rerunning_into_the_same_directory_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, _journal) = replicator(gallery(), GALLERY_ASSETS);

    let a = replicator.replicate("example.com", Some(tmp.path()), false).await;
    let b = replicator.replicate("example.com", Some(tmp.path()), false).await;

    assert!(a.success && b.success);
    assert_eq!(a.html, b.html);
    assert_eq!(read(tmp.path(), "index.html"), b.html);
    assert!(!tmp.path().join("index.html.partial").exists());
}

#[tokio::test]
async fn unreachable_pages_fail_without_panicking() {
    let tmp = tempfile::tempdir().unwrap();
    let page = Page { unreachable: true, ..gallery() };
    let (replicator, journal) = replicator(page, GALLERY_ASSETS);

    let result: RunResult = replicator.replicate("unreachable.invalid", Some(tmp.path()), false).await;

    assert!(!result.success);
    assert_eq!(result.stage, Stage::SessionOpen);
    assert!(result.error.as_deref().is_some_and(|e| e.contains("unreachable.invalid")));
    assert!(result.html.is_empty());
    assert!(!tmp.path().join("index.html").exists());
    assert!(journal.requests().is_empty());
    assert_eq!(journal.opened.load(Ordering::SeqCst), 1);
    assert_eq!(journal.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_targets_fail_without_panicking() {
    let tmp = tempfile::tempdir().unwrap();
    let (replicator, journal) = replicator(gallery(), GALLERY_ASSETS);

    for target in ["", "   ", "http://", "exa mple.com", "https://[::1"] {
        let result = replicator.replicate(target, Some(tmp.path()), false).await;
        assert!(!result.success, "{target:?} should fail");
        assert!(result.error.is_some());
    }
    assert_eq!(journal.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn default_output_directory_is_under_the_snapshots_root() {
    let tmp = tempfile::tempdir().unwrap();
    let journal = Arc::new(Journal::default());
    let mut config = Config::default();
    config.output.snapshots_root = tmp.path().join("snapshots");
    let launcher = PageLauncher { page: gallery(), journal: journal.clone() };
    let server = AssetServer { assets: HashMap::new(), journal: journal.clone() };
    let replicator = Replicator::new(launcher, server, config);

    let result = replicator.replicate("www.example.com/gallery", None, false).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.output_dir, tmp.path().join("snapshots/www-example-com"));
    assert!(result.output_dir.join("index.html").is_file());
}
