//! Concurrent, deduplicated asset downloads.
//!
//! Every discovered URL is resolved against the page URL, reserved in the
//! run's [`AssetIndex`] and downloaded into `assets/` with at most
//! `concurrency` requests in flight. Each download settles on its own: a
//! failure is logged, its reservation removed, and the others carry on.

mod client;
pub mod error;
mod index;
mod name;

pub use self::client::{AssetClient, HttpClient, Response};
pub use self::index::{AssetIndex, AssetRecord};
use self::name::AssetName;
use crate::bundle::ASSET_DIR;
use crate::fetch::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use sitesnap_storage::StorageBackend;
use std::path::Path;
use tracing::instrument;
use url::Url;

/// Outcome counts of one fetch batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetSummary {
    pub fetched: usize,
    pub failed: usize,
}

pub struct AssetFetcher<'a> {
    client: &'a dyn AssetClient,
    backend: &'a dyn StorageBackend,
    concurrency: usize,
}
impl<'a> AssetFetcher<'a> {
    pub fn new(client: &'a dyn AssetClient, backend: &'a dyn StorageBackend, concurrency: usize) -> Self {
        Self { client, backend, concurrency: concurrency.max(1) }
    }

    /// Download every candidate not already in `index`.
    ///
    /// The index is only touched from this task: reservations happen before
    /// any request is sent, promotions and removals as each request settles.
    #[instrument(skip_all, fields(candidates = candidates.len(), base = %base))]
    pub async fn fetch_all(&self, candidates: &[String], base: &Url, index: &mut AssetIndex) -> AssetSummary {
        let mut pending = Vec::new();
        for candidate in candidates {
            let Some(url) = resolve_candidate(candidate, base) else {
                tracing::debug!(candidate = %candidate, "Skipping asset that doesn't resolve to an HTTP(S) URL");
                continue;
            };
            if index.reserve(&url, AssetName::for_url(&url).to_string()) {
                pending.push(url);
            }
        }
        tracing::debug!(assets = pending.len(), concurrency = self.concurrency, "Fetching assets");

        let mut summary = AssetSummary::default();
        let mut queue = pending.into_iter().map(|url| self.fetch_one(url));
        let mut processing = FuturesUnordered::new();
        processing.extend(queue.by_ref().take(self.concurrency));
        while let Some((url, result)) = processing.next().await {
            match result {
                Ok(file_name) => {
                    index.promote(&url, file_name);
                    summary.fetched += 1;
                },
                Err(e) => {
                    tracing::warn!(url = %url, error = %*e, "Asset download failed");
                    index.remove(&url);
                    summary.failed += 1;
                },
            }
            if let Some(next) = queue.next() {
                processing.push(next);
            }
        }
        summary
    }

    async fn fetch_one(&self, url: Url) -> (Url, Result<String>) {
        let result = self.download(&url).await;
        (url, result)
    }

    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn download(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url).await?;
        if !response.is_success() {
            exn::bail!(ErrorKind::Status(response.status));
        }
        let name = AssetName::for_url(url).with_content_type(response.content_type.as_deref()).to_string();
        let path = Path::new(ASSET_DIR).join(&name);
        self.backend.write(&path, &response.body).await.or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(file = %name, bytes = response.body.len(), "Asset stored");
        Ok(name)
    }
}

/// Resolve a discovered reference to the absolute URL it is fetched from.
///
/// Inline `data:` URIs, empty references and anything that isn't HTTP(S)
/// after resolution yield `None`.
pub(crate) fn resolve_candidate(candidate: &str, base: &Url) -> Option<Url> {
    let candidate = candidate.trim();
    if candidate.is_empty() || is_data_uri(candidate) {
        return None;
    }
    let url = base.join(candidate).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| AssetIndex::identity(&url))
}

pub(crate) fn is_data_uri(value: &str) -> bool {
    value.trim_start().get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}
