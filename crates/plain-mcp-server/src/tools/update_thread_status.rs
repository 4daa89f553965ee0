use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ThreadStatus, mutation_result, require_non_blank, upstream_error};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to change the status of a thread
pub const UPDATE_THREAD_STATUS_TOOL_NAME: &str = "update_thread_status";

const UPDATE_THREAD_STATUS: &str = r#"mutation UpdateThreadStatus($threadId: ID!, $status: ThreadStatus!) {
  updateThread(input: { threadId: $threadId, status: $status }) {
    thread {
      id
      status
      statusChangedAt
    }
    error {
      message
      code
    }
  }
}"#;

#[derive(Clone)]
pub struct UpdateThreadStatus {
    pub tool: Tool,
}

impl Default for UpdateThreadStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the update_thread_status tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Thread ID to update
    thread_id: String,

    /// New status for the thread
    status: ThreadStatus,
}

impl Input {
    fn validate(mut self) -> Result<Self, McpError> {
        self.thread_id = require_non_blank("thread_id", &self.thread_id)?.to_string();
        Ok(self)
    }
}

impl UpdateThreadStatus {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                UPDATE_THREAD_STATUS_TOOL_NAME,
                "Update the status of a support thread",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        let input = input.validate()?;
        Ok(match input.execute(client).await {
            Ok(payload) => mutation_result(payload),
            Err(e) => upstream_error(e),
        })
    }
}

impl Executable for Input {
    fn operation(&self) -> &'static str {
        UPDATE_THREAD_STATUS
    }

    fn operation_name(&self) -> &'static str {
        "UpdateThreadStatus"
    }

    fn variables(&self) -> Value {
        json!({
            "threadId": self.thread_id,
            "status": self.status,
        })
    }

    fn shape(&self, mut data: Value) -> Value {
        data.get_mut("updateThread")
            .map(Value::take)
            .filter(|payload| !payload.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}
