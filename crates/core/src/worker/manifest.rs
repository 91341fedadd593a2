//! Static asset manifest.

use url::Url;

use crate::Error;

/// Ordered list of absolute URLs precached on install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    urls: Vec<Url>,
}

impl Manifest {
    /// Resolve absolute paths against `origin`, dropping repeats but keeping
    /// first-seen order.
    pub fn resolve<S: AsRef<str>>(origin: &Url, paths: &[S]) -> Result<Self, Error> {
        let mut urls: Vec<Url> = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            if !path.starts_with('/') {
                return Err(Error::InvalidInput(format!("manifest path must be absolute: {path}")));
            }
            let mut url = origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
            url.set_fragment(None);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_keeps_order_and_dedups() {
        let origin = Url::parse("https://learn.example.org").unwrap();
        let manifest = Manifest::resolve(&origin, &["/", "/static/a.css", "/", "/static/b.js#x", "/static/b.js"]).unwrap();
        let urls: Vec<&str> = manifest.urls().iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://learn.example.org/",
                "https://learn.example.org/static/a.css",
                "https://learn.example.org/static/b.js",
            ]
        );
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn test_resolve_rejects_relative_paths() {
        let origin = Url::parse("https://learn.example.org").unwrap();
        assert!(matches!(Manifest::resolve(&origin, &["static/a.css"]), Err(Error::InvalidInput(_))));
    }
}
