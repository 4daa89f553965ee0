use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{mutation_result, require_non_blank, upstream_error};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to add an internal note to a thread
pub const ADD_THREAD_NOTE_TOOL_NAME: &str = "add_thread_note";

const ADD_THREAD_NOTE: &str = r#"mutation AddThreadNote($threadId: ID!, $text: String!) {
  createThreadNote(input: { threadId: $threadId, text: $text }) {
    threadNote {
      id
      text
      createdAt
    }
    error {
      message
      code
    }
  }
}"#;

#[derive(Clone)]
pub struct AddThreadNote {
    pub tool: Tool,
}

impl Default for AddThreadNote {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the add_thread_note tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Thread ID to add note to
    thread_id: String,

    /// Note content
    content: String,
}

impl Input {
    fn validate(mut self) -> Result<Self, McpError> {
        self.thread_id = require_non_blank("thread_id", &self.thread_id)?.to_string();
        // Only reject blank notes; the content itself is sent untouched
        require_non_blank("content", &self.content)?;
        Ok(self)
    }
}

impl AddThreadNote {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                ADD_THREAD_NOTE_TOOL_NAME,
                "Add a note to a support thread",
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
        ADD_THREAD_NOTE
    }

    fn operation_name(&self) -> &'static str {
        "AddThreadNote"
    }

    fn variables(&self) -> Value {
        json!({
            "threadId": self.thread_id,
            "text": self.content,
        })
    }

    fn shape(&self, mut data: Value) -> Value {
        data.get_mut("createThreadNote")
            .map(Value::take)
            .filter(|payload| !payload.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}
