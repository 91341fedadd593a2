//! worker_fetch tool implementation.
//!
//! Issues a request as a page would and reports the response the worker
//! produced, plus where it came from. Dynamic cache writes finish in the
//! background after this returns.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_client::canonicalize;
use sworker_core::{AppConfig, Error, Headers, Registration, Request, RequestMode, ResponseSource};

use crate::tools::{ResponseView, json_result};

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// URL or origin-relative path (e.g. "/courses/").
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: Headers,

    /// Request mode: "navigate", "same-origin", "cors" (default) or "no-cors".
    #[serde(default)]
    pub mode: RequestMode,

    /// Optional request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The canonical request URL.
    pub url: String,

    /// Which path produced the response.
    pub source: ResponseSource,

    #[serde(flatten)]
    pub response: ResponseView,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(
    registration: &Registration, config: &AppConfig, params: WorkerFetchParams,
) -> Result<CallToolResult, McpError> {
    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(&params.method, url).with_mode(params.mode);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    if let Some(accept) = &params.accept {
        request = request.with_header("accept", accept);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let url = request.url.to_string();
    let outcome = registration.fetch(request).await;
    tracing::debug!(url = %url, source = ?outcome.source, status = outcome.response.status, "worker fetch");

    json_result(&WorkerFetchOutput { url, source: outcome.source, response: ResponseView::from(&outcome.response) })
}
