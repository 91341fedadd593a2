//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheListParams, get_impl, list_impl};
use crate::tools::worker::{
    WorkerClientsParams, WorkerFetchParams, WorkerInstallParams, WorkerMessageParams, clients_impl, fetch_impl,
    install_impl, message_impl, status_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use sworker_core::{AppConfig, Registration};

/// The main MCP server handler for sworker.
#[derive(Clone)]
pub struct WorkerServer {
    tool_router: ToolRouter<Self>,
    registration: Arc<Registration>,
    config: Arc<AppConfig>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler around a registration.
    pub fn new(registration: Arc<Registration>, config: AppConfig) -> Self {
        Self { tool_router: Self::tool_router(), registration, config: Arc::new(config) }
    }

    /// Register a cache generation.
    ///
    /// Precaches the static manifest, then activates or waits depending on
    /// `skip_waiting` and connected sessions.
    #[tool(
        description = "Install a cache generation: precache the static manifest, then activate or wait. Optional `version` overrides the configured cache version."
    )]
    async fn worker_install(&self, params: Parameters<WorkerInstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "Post a control message to the worker. Supported: {\"type\": \"SKIP_WAITING\"}.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.registration, params.0).await
    }

    #[tool(description = "Connect or disconnect a page session. The last disconnect activates a waiting worker.")]
    async fn worker_clients(&self, params: Parameters<WorkerClientsParams>) -> Result<CallToolResult, McpError> {
        clients_impl(&self.registration, params.0).await
    }

    #[tool(description = "Report the active and waiting workers, connected sessions, and cache stores.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration).await
    }

    /// Issue a request through the worker.
    ///
    /// Static assets are served cache-first, other same-origin GETs
    /// network-first with offline fallback. Everything else passes through.
    #[tool(
        description = "Fetch a URL through the worker as a page would. Returns the response and its source (network, static_cache, dynamic_cache, offline_page, unavailable, passthrough)."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, &self.config, params.0).await
    }

    #[tool(description = "List cache stores with entry counts. Set include_keys to list stored URLs.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(self.registration.db(), params.0).await
    }

    #[tool(description = "Get the stored response for a URL from a named cache store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.registration.db(), &self.config, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sworker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::harness;

    #[tokio::test]
    async fn test_router_lists_every_tool() {
        let (registration, _, config) = harness().await;
        let server = WorkerServer::new(registration, config);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            [
                "cache_get",
                "cache_list",
                "worker_clients",
                "worker_fetch",
                "worker_install",
                "worker_message",
                "worker_status"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info_names_sworker() {
        let (registration, _, config) = harness().await;
        let info = WorkerServer::new(registration, config).get_info();
        assert_eq!(info.server_info.name, "sworker");
    }
}
