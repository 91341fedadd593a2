//! worker_install tool implementation.
//!
//! Builds a generation from config (optionally under another version) and
//! registers it. Install failures surface as `PRECACHE_FAILED`.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_core::{AppConfig, Error, Registration};

use crate::tools::json_result;

/// Parameters for the worker_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallParams {
    /// Cache version to install (default: the configured version).
    #[serde(default)]
    pub version: Option<String>,

    /// Activate without waiting for open sessions to close (default: config).
    #[serde(default)]
    pub skip_waiting: Option<bool>,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(
    registration: &Registration, config: &AppConfig, params: WorkerInstallParams,
) -> Result<CallToolResult, McpError> {
    let generation = config
        .generation(params.version.as_deref())
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    let skip_waiting = params.skip_waiting.unwrap_or(config.skip_waiting);

    let report = registration.register(generation, skip_waiting).await?;
    json_result(&report)
}
