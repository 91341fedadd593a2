//! MCP tool implementations.
//!
//! Worker tools drive the registration lifecycle; cache tools read the named
//! stores directly.

pub mod cache;
pub mod worker;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use sworker_core::{Error, Headers, Response};

/// Render tool output as pretty-printed JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// A response as tools report it. Bodies are decoded lossily as UTF-8.
#[derive(Debug, Clone, Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub response_type: String,
    pub headers: Headers,
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str().to_string(),
            headers: response.headers.clone(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_bytes: response.body.len(),
        }
    }
}
