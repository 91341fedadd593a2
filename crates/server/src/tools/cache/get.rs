//! cache_get tool implementation.
//!
//! Retrieves the stored GET entry for a URL from one named store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_client::canonicalize;
use sworker_core::{AppConfig, CacheDb, Error};

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Store name, e.g. "akili-static-v2".
    pub cache: String,

    /// URL or origin-relative path of the stored request.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub cache: String,
    pub method: String,
    pub url: String,
    pub vary: Vec<String>,
    pub stored_at: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, config: &AppConfig, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let entry = cache
        .get_entry(&params.cache, url.as_str())
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} in {}", url, params.cache)))?;

    json_result(&CacheGetOutput {
        response: ResponseView::from(&entry.response),
        cache: entry.cache_name,
        method: entry.method,
        url: entry.url,
        vary: entry.vary,
        stored_at: entry.stored_at,
    })
}
