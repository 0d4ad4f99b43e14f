//! Utility functions and helpers.

pub mod http;
pub mod rate_limit;

use url::Url;

pub use rate_limit::RateLimiter;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Path segment `index` of a site link, e.g. segment 1 of
/// `/teams/ORL/2017.html` is `ORL`.
pub fn path_segment(href: &str, index: usize) -> Option<&str> {
    let path = href.split(['?', '#']).next()?;
    let path = match path.find("://") {
        Some(i) => path[i + 3..].split_once('/')?.1,
        None => path.trim_start_matches('/'),
    };
    path.split('/').nth(index).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("/teams/ORL/2017.html", 1), Some("ORL"));
        assert_eq!(
            path_segment("https://example.com/teams/NJN/2012.html", 1),
            Some("NJN")
        );
        assert_eq!(path_segment("/teams/", 1), None);
        assert_eq!(path_segment("/teams/BOS/2017.html?x=1", 2), Some("2017.html"));
    }
}
