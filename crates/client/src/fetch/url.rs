//! URL canonicalization for request building and cache keys.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a page-issued URL relative to the controlled origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve paths (`/...`) against `origin`
/// 3. Default scheme to https:// for bare hosts
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, origin: &Url) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let resolved = if trimmed.starts_with('/') {
        origin.join(trimmed)
    } else if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{trimmed}"))
    };
    let mut parsed = resolved.map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host, and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("http://127.0.0.1:8000").unwrap()
    }

    #[test]
    fn test_canonicalize_path_uses_origin() {
        let url = canonicalize("/static/js/main.js", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/static/js/main.js");
    }

    #[test]
    fn test_canonicalize_absolute_url_kept() {
        let url = canonicalize("https://cdn.example.net/katex.css", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.net"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com", &origin()).unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/Path", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/Path");
    }

    #[test]
    fn test_canonicalize_strips_fragment_keeps_query() {
        let url = canonicalize("/courses/?page=2#top", &origin()).unwrap();
        assert_eq!(url.query(), Some("page=2"));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   ", &origin()), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let a = Url::parse("http://127.0.0.1:8000/a").unwrap();
        assert!(same_origin(&a, &origin()));
        assert!(!same_origin(&Url::parse("https://127.0.0.1:8000/").unwrap(), &origin()));
    }
}
