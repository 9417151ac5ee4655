//! Base-path prefixing for internal links.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static URL_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s(?:href|src)\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Path prefix under which the site is served.
///
/// Always starts and ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePath(String);

impl BasePath {
    /// Create a base path, adding missing leading and trailing slashes.
    #[must_use]
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim_matches('/');
        if trimmed.is_empty() {
            Self("/".to_owned())
        } else {
            Self(format!("/{trimmed}/"))
        }
    }

    /// The base path as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the site is served from the domain root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Prefix a root-relative URL with the base path.
    ///
    /// External URLs (`scheme:` or `//host`), fragment-only and relative
    /// URLs are returned unchanged, as are URLs that already carry the
    /// prefix. Applying the function twice gives the same result as once.
    #[must_use]
    pub fn prefix<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if self.is_root() || !url.starts_with('/') || url.starts_with("//") {
            return Cow::Borrowed(url);
        }
        let bare = &self.0[..self.0.len() - 1];
        if url.starts_with(&self.0) || url == bare || url.starts_with(&format!("{bare}#")) {
            return Cow::Borrowed(url);
        }
        Cow::Owned(format!("{bare}{url}"))
    }

    /// Prefix every `href` and `src` attribute value in an HTML document.
    #[must_use]
    pub fn rewrite_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        if self.is_root() {
            return Cow::Borrowed(html);
        }
        URL_ATTR_RE.replace_all(html, |caps: &Captures<'_>| {
            let (quote, value) = match (caps.get(2), caps.get(3)) {
                (Some(v), _) => ('"', v.as_str()),
                (None, Some(v)) => ('\'', v.as_str()),
                (None, None) => unreachable!("regex requires one quoted value"),
            };
            format!("{}{quote}{}{quote}", &caps[1], self.prefix(value))
        })
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::new("/")
    }
}

impl std::fmt::Display for BasePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        assert_eq!(BasePath::new("").as_str(), "/");
        assert_eq!(BasePath::new("/").as_str(), "/");
        assert_eq!(BasePath::new("docs").as_str(), "/docs/");
        assert_eq!(BasePath::new("/swagger-brake").as_str(), "/swagger-brake/");
    }

    #[test]
    fn test_prefix_root_relative() {
        let base = BasePath::new("/docs/");
        assert_eq!(base.prefix("/x"), "/docs/x");
        assert_eq!(base.prefix("/"), "/docs/");
        assert_eq!(base.prefix("/cli/#options"), "/docs/cli/#options");
    }

    #[test]
    fn test_prefix_leaves_other_urls() {
        let base = BasePath::new("/docs/");
        assert_eq!(base.prefix("https://github.com/x"), "https://github.com/x");
        assert_eq!(base.prefix("//cdn.example.com/a.js"), "//cdn.example.com/a.js");
        assert_eq!(base.prefix("mailto:a@example.com"), "mailto:a@example.com");
        assert_eq!(base.prefix("#top"), "#top");
        assert_eq!(base.prefix("guide/"), "guide/");
        assert_eq!(base.prefix("../img.png"), "../img.png");
    }

    #[test]
    fn test_prefix_is_idempotent() {
        let base = BasePath::new("/swagger-brake/");
        for url in ["/", "/cli/", "/assets/js/app.js", "https://x.org", "#a", "rel", "/swagger-brake"] {
            let once = base.prefix(url).into_owned();
            let twice = base.prefix(&once).into_owned();
            assert_eq!(once, twice, "not idempotent for {url}");
        }
    }

    #[test]
    fn test_route_sharing_the_base_name_is_not_prefixed() {
        // A page routed at /docs/guide/ is indistinguishable from an
        // already-prefixed link under base /docs/.
        let base = BasePath::new("/docs/");
        assert_eq!(base.prefix("/docs/guide/"), "/docs/guide/");
        assert_eq!(base.prefix("/docs"), "/docs");
        assert_eq!(base.prefix("/docsite/"), "/docs/docsite/");
    }

    #[test]
    fn test_root_base_changes_nothing() {
        let base = BasePath::default();
        assert_eq!(base.prefix("/x"), "/x");
        let html = r#"<a href="/x">x</a>"#;
        assert!(matches!(base.rewrite_html(html), Cow::Borrowed(_)));
    }

    #[test]
    fn test_switching_base_from_root_to_docs() {
        let html = r#"<a href="/x">x</a> <a href="https://example.com/y">y</a>"#;

        assert_eq!(BasePath::new("/").rewrite_html(html), html);
        assert_eq!(
            BasePath::new("/docs/").rewrite_html(html),
            r#"<a href="/docs/x">x</a> <a href="https://example.com/y">y</a>"#
        );
    }

    #[test]
    fn test_rewrite_html_attributes() {
        let base = BasePath::new("/docs/");
        let html = concat!(
            r#"<link rel="stylesheet" href="/assets/css/quire.css">"#,
            r#"<img SRC='/img/a.png' alt="/not-a-link">"#,
            r#"<script src="/assets/js/back-to-top.js" defer></script>"#,
            r##"<a href="#top">top</a>"##,
        );

        let rewritten = base.rewrite_html(html);

        assert_eq!(
            rewritten,
            concat!(
                r#"<link rel="stylesheet" href="/docs/assets/css/quire.css">"#,
                r#"<img SRC='/docs/img/a.png' alt="/not-a-link">"#,
                r#"<script src="/docs/assets/js/back-to-top.js" defer></script>"#,
                r##"<a href="#top">top</a>"##,
            )
        );
    }

    #[test]
    fn test_rewrite_html_is_idempotent() {
        let base = BasePath::new("/docs/");
        let html = r#"<a href="/guide/">g</a><img src="/a.png">"#;
        let once = base.rewrite_html(html).into_owned();
        assert_eq!(base.rewrite_html(&once), once);
    }
}
