//! worker_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use sworker_core::Registration;

use crate::tools::json_result;

/// Implementation of the worker_status tool.
pub async fn status_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let status = registration.status().await?;
    json_result(&status)
}
