//! reqwest-backed network primitive for the offline worker.
//!
//! ### Request mapping
//! - Method, headers, and body are forwarded as issued by the page
//! - Redirects are followed up to the configured limit
//! - Bodies over `max_bytes` reject the fetch
//!
//! ### Response classification
//! - `basic` when the final URL shares the controlled origin
//! - `cors` when a cross-origin response carries `Access-Control-Allow-Origin`
//! - `opaque` otherwise
//!
//! HTTP error statuses are returned as responses; only transport failures
//! reject the fetch.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, same_origin};

use sworker_core::http::{Headers, Request, Response, ResponseType};
use sworker_core::{AppConfig, Error, Network, NetworkError};

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin whose responses are classified as `basic`.
    pub origin: ::url::Url,

    /// User agent string (default: "sworker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self {
            origin,
            user_agent: "sworker/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }

    /// Build from the application config.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self {
            origin,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        })
    }
}

/// HTTP network used by the worker in production.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, final_url: &::url::Url, headers: &header::HeaderMap) -> ResponseType {
        if same_origin(final_url, &self.config.origin) {
            ResponseType::Basic
        } else if headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
            ResponseType::Cors
        } else {
            ResponseType::Opaque
        }
    }

    fn build(&self, request: &Request) -> Result<reqwest::RequestBuilder, NetworkError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(format!("{}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }

    fn too_large(&self, len: usize) -> NetworkError {
        NetworkError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn collect_headers(headers: &header::HeaderMap) -> Headers {
    let mut out = Headers::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let start = Instant::now();

        let response = self.build(request)?.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout(request.url.to_string())
            } else {
                NetworkError::Unreachable(format!("{}: {}", request.url, e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch complete"
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers: collect_headers(&headers),
            body: bytes,
            response_type: self.classify(&final_url, &headers),
            url: Some(final_url),
        })
    }
}
