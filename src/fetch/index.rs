use std::collections::HashMap;
use url::Url;

/// One asset URL the run has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    url: Url,
    file_name: String,
    fetched: bool,
}
impl AssetRecord {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Name of the file under the bundle's `assets/` directory.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn fetched(&self) -> bool {
        self.fetched
    }
}

/// Deduplication index for one run, keyed by absolute URL without fragment.
///
/// A record is reserved (`fetched = false`) before its download starts and is
/// then either promoted or removed; failed assets leave nothing behind.
#[derive(Debug, Default)]
pub struct AssetIndex {
    records: HashMap<String, AssetRecord>,
}
impl AssetIndex {
    /// The identity an asset URL is indexed under.
    pub fn identity(url: &Url) -> Url {
        let mut url = url.clone();
        url.set_fragment(None);
        url
    }

    /// Reserve `url` for download. Returns `false` when it is already known.
    pub(crate) fn reserve(&mut self, url: &Url, file_name: String) -> bool {
        let url = Self::identity(url);
        if self.records.contains_key(url.as_str()) {
            return false;
        }
        self.records.insert(url.as_str().to_string(), AssetRecord { url, file_name, fetched: false });
        true
    }

    pub(crate) fn promote(&mut self, url: &Url, file_name: String) {
        if let Some(record) = self.records.get_mut(Self::identity(url).as_str()) {
            record.file_name = file_name;
            record.fetched = true;
        }
    }

    pub(crate) fn remove(&mut self, url: &Url) {
        self.records.remove(Self::identity(url).as_str());
    }

    pub fn get(&self, url: &Url) -> Option<&AssetRecord> {
        self.records.get(Self::identity(url).as_str())
    }

    /// File name of `url`, if it was downloaded.
    pub fn local_name(&self, url: &Url) -> Option<&str> {
        self.get(url).filter(|record| record.fetched).map(AssetRecord::file_name)
    }

    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
