use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use rslug::slugify;
use std::path::{Path, PathBuf};
use url::Url;

/// Canonicalize a user-supplied target into an absolute URL string.
///
/// Surrounding whitespace is trimmed and `https://` is prefixed unless the
/// input already starts with an HTTP(S) scheme (in any case). Never fails;
/// whether the result actually parses is decided by [`Target::new`].
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        trimmed.get(..scheme.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    if has_scheme { trimmed.to_string() } else { format!("https://{trimmed}") }
}

/// What one run captures, and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
    output_dir: PathBuf,
    sanitize: bool,
}
impl Target {
    /// Normalize and parse `input`, and decide the output directory.
    ///
    /// Without an explicit `output_dir` the bundle goes under
    /// `snapshots_root`, in a directory named after the target host. Relative
    /// directories are made absolute against the working directory.
    pub fn new(input: &str, output_dir: Option<&Path>, snapshots_root: &Path, sanitize: bool) -> Result<Self> {
        let normalized = normalize_url(input);
        let url = Url::parse(&normalized).map_err(|e| exn::Exn::from(ErrorKind::InvalidTarget(format!("{normalized}: {e}"))))?;
        let host = url.host_str().ok_or_raise(|| ErrorKind::InvalidTarget(normalized.clone()))?;
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => snapshots_root.join(host_directory(host)),
        };
        let output_dir = std::path::absolute(&output_dir).map_err(|e| {
            exn::Exn::from(ErrorKind::InvalidTarget(format!("{}: {e}", output_dir.display())))
        })?;
        Ok(Self { url, output_dir, sanitize })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn sanitize(&self) -> bool {
        self.sanitize
    }
}

fn host_directory(host: &str) -> String {
    let slug = slugify!(host);
    if slug.is_empty() { "snapshot".to_string() } else { slug }
}
