//! cache_list tool implementation.
//!
//! Lists the named stores with their entry counts, optionally with the
//! request URLs each one holds.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_core::CacheDb;

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Include each store's request URLs in insertion order.
    #[serde(default)]
    pub include_keys: bool,
}

/// Summary of one store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let mut stores = Vec::new();
    for name in cache.store_names().await? {
        let entries = cache.entry_count(&name).await?;
        let keys = if params.include_keys { Some(cache.keys(&name).await?) } else { None };
        stores.push(StoreSummary { name, entries, keys });
    }

    json_result(&CacheListOutput { stores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{harness, output};
    use crate::tools::worker::{WorkerInstallParams, install_impl};

    #[tokio::test]
    async fn test_list_empty() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let out = output(&list_impl(&cache, CacheListParams::default()).await.unwrap());
        assert_eq!(out["stores"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_after_install() {
        let (registration, _, config) = harness().await;
        install_impl(&registration, &config, WorkerInstallParams::default()).await.unwrap();

        let out = output(&list_impl(registration.db(), CacheListParams { include_keys: true }).await.unwrap());
        let stores = out["stores"].as_array().unwrap();
        let static_store = stores.iter().find(|s| s["name"] == "akili-static-v2").unwrap();

        assert_eq!(static_store["entries"], 2);
        assert_eq!(static_store["keys"][0], "https://learn.example.org/");
        assert_eq!(static_store["keys"][1], "https://learn.example.org/static/js/main.js");
    }
}
