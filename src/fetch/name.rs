//! Local file names for downloaded assets.
//!
//! A name is derived from the URL alone, so the same asset gets the same name
//! in every run: `{slug of basename}-{digest}.{ext}`. The digest is a prefix
//! of the BLAKE3 hash of the absolute URL and keeps `/a/logo.png` and
//! `/b/logo.png` apart.

use rslug::slugify;
use std::fmt::{self, Display, Formatter};
use url::Url;

const DIGEST_LEN: usize = 12;
const MAX_STEM_LEN: usize = 48;
const FALLBACK_STEM: &str = "asset";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AssetName {
    stem: String,
    extension: Option<String>,
}
impl AssetName {
    pub(crate) fn for_url(url: &Url) -> Self {
        let basename = url.path_segments().and_then(|mut segments| segments.next_back()).unwrap_or_default();
        let (stem, extension) = match basename.rsplit_once('.') {
            Some((stem, ext)) if is_extension(ext) => (stem, Some(ext.to_ascii_lowercase())),
            _ => (basename, None),
        };
        let slug: String = slugify!(stem).chars().take(MAX_STEM_LEN).collect();
        let slug = slug.trim_end_matches('-');
        let slug = if slug.is_empty() { FALLBACK_STEM } else { slug };
        let digest = blake3::hash(url.as_str().as_bytes()).to_hex();
        Self { stem: format!("{slug}-{}", &digest[..DIGEST_LEN]), extension }
    }

    /// Fill in a missing extension from the response's media type.
    pub(crate) fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        if self.extension.is_none() {
            self.extension = content_type.and_then(extension_for).map(str::to_string);
        }
        self
    }
}
impl Display for AssetName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}.{}", self.stem, ext),
            None => write!(f, "{}", self.stem),
        }
    }
}

fn is_extension(candidate: &str) -> bool {
    (1..=5).contains(&candidate.len()) && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    Some(match essence.as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/tiff" => "tiff",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn name(url: &str) -> String {
        AssetName::for_url(&Url::parse(url).unwrap()).to_string()
    }

    fn digest(url: &str) -> String {
        blake3::hash(Url::parse(url).unwrap().as_str().as_bytes()).to_hex()[..DIGEST_LEN].to_string()
    }

    #[test]
    fn basename_is_slugified_and_suffixed() {
        let url = "https://example.com/img/Hero-Banner.PNG";
        assert_eq!(name(url), format!("hero-banner-{}.png", digest(url)));
    }

    #[test]
    fn equal_basenames_under_different_paths_differ() {
        let a = name("https://example.com/a/logo.png");
        let b = name("https://example.com/b/logo.png");
        assert!(a.starts_with("logo-") && a.ends_with(".png"));
        assert!(b.starts_with("logo-") && b.ends_with(".png"));
        assert_ne!(a, b);
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(name("https://example.com/a/logo.png"), name("https://example.com/a/logo.png"));
    }

    #[rstest]
    #[case("https://example.com/")]
    #[case("https://example.com")]
    #[case("https://example.com/images/")]
    fn empty_basename_falls_back(#[case] url: &str) {
        assert_eq!(name(url), format!("asset-{}", digest(url)));
    }

    #[rstest]
    #[case(Some("image/png"), "png")]
    #[case(Some("image/svg+xml; charset=utf-8"), "svg")]
    #[case(Some("IMAGE/JPEG"), "jpg")]
    fn extension_is_inferred_from_content_type(#[case] content_type: Option<&str>, #[case] ext: &str) {
        let url = Url::parse("https://cdn.example.com/render?id=7").unwrap();
        let name = AssetName::for_url(&url).with_content_type(content_type).to_string();
        assert!(name.starts_with("render-"));
        assert!(name.ends_with(&format!(".{ext}")));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("application/octet-stream"))]
    fn unknown_content_type_leaves_no_extension(#[case] content_type: Option<&str>) {
        let url = Url::parse("https://cdn.example.com/render").unwrap();
        let name = AssetName::for_url(&url).with_content_type(content_type).to_string();
        assert!(!name.contains('.'));
    }

    #[test]
    fn existing_extension_wins_over_content_type() {
        let url = Url::parse("https://example.com/photo.jpeg").unwrap();
        let name = AssetName::for_url(&url).with_content_type(Some("image/webp")).to_string();
        assert!(name.ends_with(".jpeg"));
    }

    #[test]
    fn long_basenames_are_truncated() {
        let long = "a".repeat(200);
        let name = name(&format!("https://example.com/{long}.gif"));
        assert_eq!(name.len(), MAX_STEM_LEN + 1 + DIGEST_LEN + ".gif".len());
    }
}
