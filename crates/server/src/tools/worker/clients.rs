//! worker_clients tool implementation.
//!
//! Opens or closes a page session. Closing the last session lets a waiting
//! worker activate.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_core::Registration;
use sworker_core::worker::ActivateReport;

use crate::tools::json_result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Connect,
    Disconnect,
}

/// Parameters for the worker_clients tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerClientsParams {
    /// "connect" or "disconnect".
    pub action: ClientAction,
}

/// Output from the worker_clients tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerClientsOutput {
    /// Connected page sessions after the action.
    pub clients: usize,

    /// Present when the action let a waiting worker activate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivateReport>,
}

/// Implementation of the worker_clients tool.
pub async fn clients_impl(registration: &Registration, params: WorkerClientsParams) -> Result<CallToolResult, McpError> {
    let output = match params.action {
        ClientAction::Connect => WorkerClientsOutput { clients: registration.connect_client().await, activation: None },
        ClientAction::Disconnect => {
            let activation = registration.disconnect_client().await?;
            let clients = registration.status().await?.clients;
            WorkerClientsOutput { clients, activation }
        }
    };
    json_result(&output)
}
