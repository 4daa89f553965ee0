//! MCP tools exposing Plain customer support operations to an AI agent.

pub(crate) mod add_thread_note;
pub(crate) mod analyze_thread_patterns;
pub(crate) mod fetch_threads;
pub(crate) mod get_customer_info;
pub(crate) mod get_thread_details;
pub(crate) mod search_threads;
pub(crate) mod update_thread_status;

use std::ops::RangeInclusive;

use rmcp::model::{CallToolResult, Content, JsonObject};
use rmcp::schemars::{self, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{GraphQLError, McpError, validation_error};

/// Page sizes accepted by the upstream API
pub(crate) const LIMIT_RANGE: RangeInclusive<u32> = 1..=100;

pub(crate) const fn default_limit() -> u32 {
    10
}

/// Status of a support thread
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreadStatus {
    Todo,
    Done,
    Snoozed,
}

/// Deserialize tool arguments into a tool's input type
pub(crate) fn convert_arguments<T: DeserializeOwned>(
    arguments: Option<JsonObject>,
) -> Result<T, McpError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| validation_error(format!("Invalid input: {e}")))
}

pub(crate) fn require_non_blank<'a>(field: &str, value: &'a str) -> Result<&'a str, McpError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(validation_error(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

pub(crate) fn require_in_range(
    field: &str,
    value: u32,
    range: RangeInclusive<u32>,
) -> Result<u32, McpError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(validation_error(format!(
            "{field} must be between {} and {}",
            range.start(),
            range.end()
        )))
    }
}

/// Collect the `node` of every edge in a GraphQL connection
pub(crate) fn connection_nodes(connection: Option<&Value>) -> Vec<Value> {
    connection
        .and_then(|connection| connection.get("edges"))
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .filter_map(|edge| edge.get("node"))
                .filter(|node| !node.is_null())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

fn json_content(value: &Value) -> Content {
    Content::text(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
}

pub(crate) fn success(value: &Value) -> CallToolResult {
    CallToolResult {
        content: vec![json_content(value)],
        is_error: Some(false),
    }
}

pub(crate) fn failure(value: &Value) -> CallToolResult {
    CallToolResult {
        content: vec![json_content(value)],
        is_error: Some(true),
    }
}

/// Report an upstream failure to the agent as a structured error result
pub(crate) fn upstream_error(error: GraphQLError) -> CallToolResult {
    failure(&error.to_payload())
}

/// Mutation payloads carry their own `error` field alongside the result
pub(crate) fn mutation_result(payload: Value) -> CallToolResult {
    if payload.get("error").is_some_and(|error| !error.is_null()) {
        failure(&payload)
    } else {
        success(&payload)
    }
}

/// Read the JSON text of the first content item of a tool result
#[cfg(test)]
pub(crate) fn result_json(result: &CallToolResult) -> Value {
    let text = result
        .content
        .first()
        .and_then(|content| content.as_text())
        .map(|text| text.text.clone())
        .unwrap();
    serde_json::from_str(&text).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;
    use rstest::rstest;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Input {
        #[allow(dead_code)]
        thread_id: String,
        #[serde(default = "default_limit")]
        limit: u32,
    }

    #[test]
    fn convert_arguments_applies_defaults() {
        let arguments = json!({"thread_id": "th_1"}).as_object().cloned();

        let input: Input = convert_arguments(arguments).unwrap();

        assert_eq!(input.limit, 10);
    }

    #[test]
    fn convert_arguments_rejects_missing_fields() {
        let error = convert_arguments::<Input>(None).unwrap_err();

        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
        assert!(error.message.contains("missing field `thread_id`"));
    }

    #[test]
    fn thread_status_uses_upstream_names() {
        assert_eq!(json!(ThreadStatus::Snoozed), json!("SNOOZED"));
        assert_eq!(
            serde_json::from_value::<ThreadStatus>(json!("DONE")).unwrap(),
            ThreadStatus::Done
        );
        assert!(serde_json::from_value::<ThreadStatus>(json!("done")).is_err());
    }

    #[rstest]
    #[case("", false)]
    #[case("   ", false)]
    #[case(" th_1 ", true)]
    fn blank_values_are_rejected(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(require_non_blank("thread_id", value).is_ok(), ok);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(100, true)]
    #[case(101, false)]
    fn limits_are_bounded(#[case] limit: u32, #[case] ok: bool) {
        assert_eq!(require_in_range("limit", limit, LIMIT_RANGE).is_ok(), ok);
    }

    #[test]
    fn connection_nodes_skips_missing_nodes() {
        let connection = json!({
            "edges": [
                {"node": {"id": "a"}},
                {"node": null},
                {"cursor": "x"},
                {"node": {"id": "b"}},
            ]
        });

        assert_eq!(
            connection_nodes(Some(&connection)),
            vec![json!({"id": "a"}), json!({"id": "b"})]
        );
        assert!(connection_nodes(None).is_empty());
    }

    #[test]
    fn mutation_errors_flag_the_result() {
        let failed = mutation_result(json!({
            "thread": null,
            "error": {"message": "Thread not found", "code": "not_found"},
        }));
        let succeeded = mutation_result(json!({"thread": {"id": "th_1"}, "error": null}));

        assert_eq!(failed.is_error, Some(true));
        assert_eq!(succeeded.is_error, Some(false));
        assert_eq!(result_json(&succeeded)["thread"]["id"], "th_1");
    }
}
