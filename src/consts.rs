use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// The property half of a `background` or `background-image` declaration.
regex!(BACKGROUND_PROPERTY_REGEX, r"(?i)\bbackground(?:-image)?\s*:");
// One `url(...)` token: double-quoted, single-quoted or bare.
regex!(CSS_URL_REGEX, r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))\s*\)"#);
// Characters a browser strips from a URL before looking at its scheme.
regex!(URL_NOISE_REGEX, r"[\x00-\x20\x7f]+");
