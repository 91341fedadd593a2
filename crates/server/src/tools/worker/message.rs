//! worker_message tool implementation.
//!
//! Posts a control message to the registration. Only
//! `{"type": "SKIP_WAITING"}` is understood.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sworker_core::{ControlMessage, Registration};

use crate::tools::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// The message payload, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(registration: &Registration, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::from_json(&params.message)?;
    let outcome = registration.post_message(message).await?;
    json_result(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{harness, output};
    use crate::tools::worker::{WorkerInstallParams, install_impl};
    use serde_json::json;

    #[tokio::test]
    async fn test_skip_waiting_activates_waiting_worker() {
        let (registration, _, config) = harness().await;
        install_impl(&registration, &config, WorkerInstallParams::default()).await.unwrap();
        registration.connect_client().await;
        let params = WorkerInstallParams { version: Some("v3".into()), skip_waiting: Some(false) };
        install_impl(&registration, &config, params).await.unwrap();

        let result = message_impl(&registration, WorkerMessageParams { message: json!({"type": "SKIP_WAITING"}) })
            .await
            .unwrap();
        let out = output(&result);

        assert_eq!(out["outcome"], "activated");
        assert_eq!(out["worker"]["version"], "v3");
        let deleted: Vec<&str> = out["activation"]["deleted"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(deleted.contains(&"akili-static-v2"));
    }

    #[tokio::test]
    async fn test_skip_waiting_without_waiting_worker() {
        let (registration, _, _) = harness().await;
        let result = message_impl(&registration, WorkerMessageParams { message: json!({"type": "SKIP_WAITING"}) })
            .await
            .unwrap();
        assert_eq!(output(&result)["outcome"], "no_waiting_worker");
    }

    #[tokio::test]
    async fn test_unknown_message_rejected() {
        let (registration, _, _) = harness().await;
        let err = message_impl(&registration, WorkerMessageParams { message: json!({"type": "CLAIM"}) })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32021);
    }
}
