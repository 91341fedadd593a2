//! Request and response snapshots exchanged between pages, the worker,
//! the network, and the cache stores.
//!
//! Header names are stored lower-cased so lookups are case-insensitive.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Lower-cased header name to value.
pub type Headers = BTreeMap<String, String>;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// Response classification as seen by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response; headers and body are readable.
    Basic,
    /// Cross-origin response permitted by CORS.
    Cors,
    /// Cross-origin response without CORS; unusable to the page.
    Opaque,
    /// Network error.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

/// An outgoing request issued by a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
    pub mode: RequestMode,
    pub body: Option<Bytes>,
}

impl Request {
    /// A plain `GET` for the given URL. The fragment is dropped.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.to_ascii_uppercase(), url, headers: Headers::new(), mode: RequestMode::default(), body: None }
    }

    /// Parse an absolute URL into a `GET` request.
    pub fn parse_get(url: &str) -> Result<Self, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::get(url))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Only `GET` is intercepted; every other verb may have side effects.
    pub fn is_retrieval(&self) -> bool {
        self.method == "GET"
    }

    /// True for navigations and for requests whose `Accept` mentions HTML.
    pub fn accepts_html(&self) -> bool {
        self.mode == RequestMode::Navigate || self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }
}

/// A captured response: status, headers, and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
    pub url: Option<Url>,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: Headers::new(),
            body: body.into(),
            url: None,
            response_type: ResponseType::Basic,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Status in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only successful same-origin responses may be written to a store.
    pub fn is_storable(&self) -> bool {
        self.is_ok() && self.response_type == ResponseType::Basic
    }

    /// Header names listed in `Vary`, lower-cased.
    pub fn vary(&self) -> Vec<String> {
        self.header("vary")
            .map(|v| {
                v.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Minimal offline response handed to pages when every fallback missed.
    pub fn service_unavailable() -> Self {
        let mut response = Self::new(503, Bytes::from_static(b"Offline")).with_header("content-type", "text/plain");
        response.status_text = "Service Unavailable".into();
        response
    }

    /// The platform network-error response: status 0, no body.
    pub fn network_error() -> Self {
        Self::new(0, Bytes::new()).with_type(ResponseType::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_drops_fragment_and_uppercases_method() {
        let req = Request::new("post", Url::parse("https://example.com/a#frag").unwrap());
        assert_eq!(req.method, "POST");
        assert_eq!(req.url.as_str(), "https://example.com/a");
        assert!(!req.is_retrieval());
    }

    #[test]
    fn test_accepts_html() {
        let req = Request::parse_get("https://example.com/").unwrap();
        assert!(!req.accepts_html());

        let req = req.with_header("Accept", "text/html,application/xhtml+xml");
        assert!(req.accepts_html());

        let nav = Request::parse_get("https://example.com/").unwrap().with_mode(RequestMode::Navigate);
        assert!(nav.accepts_html());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::parse_get("https://example.com/").unwrap().with_header("X-Token", "abc");
        assert_eq!(req.header("x-token"), Some("abc"));
        assert_eq!(req.header("X-TOKEN"), Some("abc"));
    }

    #[test]
    fn test_storable_requires_ok_and_basic() {
        assert!(Response::new(200, "ok").is_storable());
        assert!(!Response::new(404, "missing").is_storable());
        assert!(!Response::new(200, "x").with_type(ResponseType::Opaque).is_storable());
        assert!(!Response::new(200, "x").with_type(ResponseType::Cors).is_storable());
    }

    #[test]
    fn test_vary_parsing() {
        let resp = Response::new(200, "").with_header("Vary", "Accept-Encoding, Accept");
        assert_eq!(resp.vary(), vec!["accept-encoding".to_string(), "accept".to_string()]);
        assert!(Response::new(200, "").vary().is_empty());
    }

    #[test]
    fn test_service_unavailable() {
        let resp = Response::service_unavailable();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.body.as_ref(), b"Offline");
        assert_eq!(resp.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_response_type_round_trip_names() {
        for t in [ResponseType::Basic, ResponseType::Cors, ResponseType::Opaque, ResponseType::Error] {
            assert_eq!(ResponseType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResponseType::parse("weird"), None);
    }
}
