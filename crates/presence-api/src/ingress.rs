//! Base-path handling for add-ons served behind a reverse-ingress proxy.
//!
//! Home Assistant mounts the add-on under a per-install prefix such as
//! `/api/hassio_ingress/<token>`. Every request path is prefixed with that
//! base, which is either configured explicitly or detected from a dashboard
//! URL the user pasted.

use std::fmt;

use url::Url;

/// Dashboard route that marks where the add-on's own paths begin.
const AUTOMATION_ROUTE: &str = "/automation";

/// Normalized URL prefix under which the add-on is reachable.
///
/// Always starts with `/`, never ends with one unless it is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl BasePath {
    /// The root base path (`/`).
    pub fn root() -> Self {
        Self("/".into())
    }

    /// Build from an explicitly configured prefix.
    pub fn new(raw: &str) -> Self {
        let normalized = normalize_path(raw);
        if normalized.starts_with('/') {
            Self(normalized)
        } else {
            Self(format!("/{normalized}"))
        }
    }

    /// Detect the base from a dashboard pathname.
    ///
    /// Anything before the first `/automation` segment is the base; a path
    /// without that route is taken as the base itself.
    pub fn detect(pathname: &str) -> Self {
        let normalized = normalize_path(pathname);
        if normalized == "/" {
            return Self::root();
        }

        match normalized.find(AUTOMATION_ROUTE) {
            Some(0) => Self::root(),
            Some(index) => Self::new(&normalized[..index]),
            None => Self::new(&normalized),
        }
    }

    /// Split a pasted dashboard URL into its origin and detected base path.
    pub fn from_dashboard_url(url: &Url) -> (Url, Self) {
        let base = Self::detect(url.path());
        let mut origin = url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        (origin, base)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Prefix `path` with this base.
    ///
    /// Absolute URLs (`scheme:` or `//host`) pass through untouched, and a
    /// path that already lives under the base is not prefixed twice.
    pub fn join(&self, path: &str) -> String {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return self.0.clone();
        }
        if has_scheme(trimmed) || trimmed.starts_with("//") {
            return trimmed.to_owned();
        }

        let rooted = if trimmed.starts_with('/') {
            trimmed.to_owned()
        } else {
            format!("/{trimmed}")
        };

        if self.is_root() {
            return rooted;
        }
        if rooted == self.0
            || rooted
                .strip_prefix(self.0.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        {
            return rooted;
        }
        format!("{}{rooted}", self.0)
    }
}

impl Default for BasePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim whitespace and trailing slashes; empty and `/` both become `/`.
pub fn normalize_path(value: &str) -> String {
    let trimmed = value.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() {
        "/".into()
    } else {
        stripped.to_owned()
    }
}

fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slashes() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("  /  "), "/");
        assert_eq!(normalize_path("/ingress/abc///"), "/ingress/abc");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn detect_uses_prefix_before_automation() {
        assert_eq!(BasePath::detect("/").as_str(), "/");
        assert_eq!(BasePath::detect("/automation/capabilities").as_str(), "/");
        assert_eq!(
            BasePath::detect("/api/hassio_ingress/tok/automation/capabilities/new").as_str(),
            "/api/hassio_ingress/tok"
        );
        assert_eq!(
            BasePath::detect("/api/hassio_ingress/tok/").as_str(),
            "/api/hassio_ingress/tok"
        );
    }

    #[test]
    fn join_on_root_only_roots_the_path() {
        let base = BasePath::root();
        assert_eq!(base.join("api/devices"), "/api/devices");
        assert_eq!(base.join("/api/devices"), "/api/devices");
        assert_eq!(base.join(""), "/");
    }

    #[test]
    fn join_prefixes_once() {
        let base = BasePath::new("/ingress/abc/");
        assert_eq!(base.as_str(), "/ingress/abc");
        assert_eq!(base.join("/api/devices"), "/ingress/abc/api/devices");
        assert_eq!(base.join("/ingress/abc/api/devices"), "/ingress/abc/api/devices");
        assert_eq!(base.join("/ingress/abc"), "/ingress/abc");
        assert_eq!(base.join("/ingress/abcdef"), "/ingress/abc/ingress/abcdef");
        assert_eq!(base.join("   "), "/ingress/abc");
    }

    #[test]
    fn join_passes_absolute_urls_through() {
        let base = BasePath::new("/ingress/abc");
        assert_eq!(base.join("https://example.com/x"), "https://example.com/x");
        assert_eq!(base.join("//cdn.example.com/x"), "//cdn.example.com/x");
        assert_eq!(base.join("a+b.c-d:rest"), "a+b.c-d:rest");
        assert_eq!(base.join("1http:x"), "/ingress/abc/1http:x");
    }

    #[test]
    fn new_roots_relative_prefixes() {
        assert_eq!(BasePath::new("ingress").as_str(), "/ingress");
    }

    #[test]
    fn dashboard_url_is_split_into_origin_and_base() {
        let url = Url::parse("http://ha.local:8123/api/hassio_ingress/tok/automation?x=1#y")
            .expect("valid url");
        let (origin, base) = BasePath::from_dashboard_url(&url);
        assert_eq!(origin.as_str(), "http://ha.local:8123/");
        assert_eq!(base.as_str(), "/api/hassio_ingress/tok");
    }
}
