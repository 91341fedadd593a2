//! Request classification for the fetch handler.

use url::{Origin, Url};

use crate::http::Request;

/// How the worker treats one intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not a retrieval; hand straight to the network.
    Passthrough,
    /// Same-origin build asset; cache-first against the static store.
    StaticAsset,
    /// Everything else; network-first with dynamic-store fallback.
    Dynamic,
}

/// The controlled origin and the path prefixes that hold static assets.
#[derive(Debug, Clone)]
pub struct Scope {
    origin: Origin,
    static_prefixes: Vec<String>,
}

impl Scope {
    pub fn new(origin: Url, static_prefixes: Vec<String>) -> Self {
        Self { origin: origin.origin(), static_prefixes }
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    pub fn route(&self, request: &Request) -> Route {
        if !request.is_retrieval() {
            return Route::Passthrough;
        }

        let path = request.url.path();
        if self.is_same_origin(&request.url) && self.static_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            Route::StaticAsset
        } else {
            Route::Dynamic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new(Url::parse("https://learn.example.org").unwrap(), vec!["/static/".into()])
    }

    #[test]
    fn test_route_static_asset() {
        let req = Request::parse_get("https://learn.example.org/static/js/main.js").unwrap();
        assert_eq!(scope().route(&req), Route::StaticAsset);
    }

    #[test]
    fn test_route_cross_origin_static_path_is_dynamic() {
        let req = Request::parse_get("https://cdn.example.net/static/js/main.js").unwrap();
        assert_eq!(scope().route(&req), Route::Dynamic);
    }

    #[test]
    fn test_route_page_is_dynamic() {
        let req = Request::parse_get("https://learn.example.org/courses/12/").unwrap();
        assert_eq!(scope().route(&req), Route::Dynamic);
    }

    #[test]
    fn test_route_non_get_passthrough() {
        let req = Request::new("POST", Url::parse("https://learn.example.org/static/upload").unwrap());
        assert_eq!(scope().route(&req), Route::Passthrough);
    }

    #[test]
    fn test_same_origin_respects_port() {
        let scope = Scope::new(Url::parse("http://127.0.0.1:8000").unwrap(), vec![]);
        assert!(scope.is_same_origin(&Url::parse("http://127.0.0.1:8000/a").unwrap()));
        assert!(!scope.is_same_origin(&Url::parse("http://127.0.0.1:9000/a").unwrap()));
    }
}
