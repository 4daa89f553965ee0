use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{require_non_blank, success, upstream_error};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to get a single thread with its timeline
pub const GET_THREAD_DETAILS_TOOL_NAME: &str = "get_thread_details";

const GET_THREAD_DETAILS: &str = r#"query GetThreadDetails($threadId: ID!) {
  thread(threadId: $threadId) {
    id
    title
    description
    status
    statusChangedAt
    assignedToUser {
      id
      fullName
    }
    customer {
      id
      fullName
      email {
        email
      }
      company {
        id
        name
      }
    }
    createdAt
    updatedAt
    priority
    labels {
      id
      labelType {
        name
      }
    }
    timeline(first: 20) {
      edges {
        node {
          id
          timestamp
          actor {
            ... on UserActor {
              user {
                id
                fullName
              }
            }
            ... on CustomerActor {
              customer {
                id
                fullName
              }
            }
          }
          ... on ThreadChatTimelineEntry {
            chat {
              text
            }
          }
          ... on ThreadNoteTimelineEntry {
            note {
              text
            }
          }
        }
      }
    }
  }
}"#;

#[derive(Clone)]
pub struct GetThreadDetails {
    pub tool: Tool,
}

impl Default for GetThreadDetails {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the get_thread_details tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Thread ID to get details for
    thread_id: String,
}

impl Input {
    pub(crate) fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }

    fn validate(mut self) -> Result<Self, McpError> {
        self.thread_id = require_non_blank("thread_id", &self.thread_id)?.to_string();
        Ok(self)
    }
}

impl GetThreadDetails {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                GET_THREAD_DETAILS_TOOL_NAME,
                "Get detailed information about a specific thread including timeline",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        let input = input.validate()?;
        Ok(match input.execute(client).await {
            Ok(thread) => success(&thread),
            Err(e) => upstream_error(e),
        })
    }
}

impl Executable for Input {
    fn operation(&self) -> &'static str {
        GET_THREAD_DETAILS
    }

    fn operation_name(&self) -> &'static str {
        "GetThreadDetails"
    }

    fn variables(&self) -> Value {
        json!({ "threadId": self.thread_id })
    }

    /// Unknown threads come back as `null` and are reported as an empty object
    fn shape(&self, data: Value) -> Value {
        match data.get("thread") {
            Some(thread) if !thread.is_null() => thread.clone(),
            _ => Value::Object(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::test_client;
    use crate::tools::result_json;
    use mockito::Matcher;

    #[tokio::test]
    async fn execute_returns_thread_with_timeline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "operationName": "GetThreadDetails",
                "variables": {"threadId": "th_details123"},
            })))
            .with_status(200)
            .with_body(
                json!({
                    "data": {
                        "thread": {
                            "id": "th_details123",
                            "title": "Detailed Thread",
                            "timeline": {
                                "edges": [{
                                    "node": {
                                        "id": "entry_1",
                                        "timestamp": "2024-01-01T10:00:00Z",
                                        "note": {"text": "Escalated"},
                                    }
                                }]
                            },
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = GetThreadDetails::new()
            .execute(&test_client(&server.url()), Input::new(" th_details123 "))
            .await
            .unwrap();

        let json = result_json(&result);
        assert_eq!(json["id"], "th_details123");
        assert_eq!(json["title"], "Detailed Thread");
        assert!(json.get("timeline").is_some());
        mock.assert_async().await;
    }

    #[test]
    fn missing_thread_is_an_empty_object() {
        let input = Input::new("th_missing");

        assert_eq!(input.shape(json!({"thread": null})), json!({}));
        assert_eq!(input.shape(json!({})), json!({}));
    }

    #[test]
    fn blank_thread_id_is_rejected() {
        let error = Input::new("").validate().unwrap_err();

        assert_eq!(error.message, "thread_id must not be empty");
    }
}
