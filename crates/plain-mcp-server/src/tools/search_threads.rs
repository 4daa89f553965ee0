use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    LIMIT_RANGE, connection_nodes, default_limit, require_in_range, require_non_blank, success,
    upstream_error,
};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to search support threads
pub const SEARCH_THREADS_TOOL_NAME: &str = "search_threads";

const SEARCH_THREADS: &str = r#"query SearchThreads($term: String!, $first: Int) {
  searchThreads(searchQuery: { term: $term }, first: $first) {
    edges {
      node {
        thread {
          id
          title
          description
          status
          customer {
            id
            fullName
            email {
              email
            }
          }
          createdAt
          updatedAt
        }
      }
    }
  }
}"#;

/// A tool to run a text search over support threads
#[derive(Clone)]
pub struct SearchThreads {
    pub tool: Tool,
}

impl Default for SearchThreads {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the search_threads tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Search query for thread content
    query: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    limit: u32,
}

impl Input {
    pub(crate) fn new(query: String, limit: u32) -> Self {
        Self { query, limit }
    }

    fn validate(mut self) -> Result<Self, McpError> {
        self.query = require_non_blank("query", &self.query)?.to_string();
        require_in_range("limit", self.limit, LIMIT_RANGE)?;
        Ok(self)
    }
}

impl SearchThreads {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                SEARCH_THREADS_TOOL_NAME,
                "Search through support threads using text search",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        let input = input.validate()?;
        Ok(match input.execute(client).await {
            Ok(results) => success(&results),
            Err(e) => upstream_error(e),
        })
    }
}

impl Executable for Input {
    fn operation(&self) -> &'static str {
        SEARCH_THREADS
    }

    fn operation_name(&self) -> &'static str {
        "SearchThreads"
    }

    fn variables(&self) -> Value {
        json!({
            "term": self.query,
            "first": self.limit,
        })
    }

    fn shape(&self, data: Value) -> Value {
        let results: Vec<Value> = connection_nodes(data.get("searchThreads"))
            .into_iter()
            .filter_map(|node| node.get("thread").filter(|t| !t.is_null()).cloned())
            .collect();
        json!({ "results": results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::test_client;
    use crate::tools::result_json;
    use mockito::Matcher;

    #[test]
    fn query_is_sent_as_a_variable() {
        let input = Input::new(r#"login "failed" \ again"#.to_string(), 3);

        assert_eq!(
            input.variables(),
            json!({"term": r#"login "failed" \ again"#, "first": 3})
        );
        assert!(!input.operation().contains("login"));
    }

    #[test]
    fn blank_query_is_rejected() {
        let error = Input::new(" ".to_string(), 10).validate().unwrap_err();

        assert_eq!(error.message, "query must not be empty");
    }

    #[test]
    fn shape_unwraps_search_nodes() {
        let shaped = Input::new("login".to_string(), 10).shape(json!({
            "searchThreads": {
                "edges": [
                    {"node": {"thread": {"id": "th_1"}}},
                    {"node": {"thread": null}},
                    {"node": {"thread": {"id": "th_2"}}},
                ]
            }
        }));

        assert_eq!(
            shaped,
            json!({"results": [{"id": "th_1"}, {"id": "th_2"}]})
        );
    }

    #[tokio::test]
    async fn execute_searches_threads() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "operationName": "SearchThreads",
                "variables": {"term": "login authentication failed", "first": 10},
            })))
            .with_status(200)
            .with_body(
                json!({
                    "data": {
                        "searchThreads": {
                            "edges": [{"node": {"thread": {"id": "th_search123", "title": "Login issue"}}}]
                        }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let input: Input =
            serde_json::from_value(json!({"query": "login authentication failed"})).unwrap();
        let result = SearchThreads::new()
            .execute(&test_client(&server.url()), input)
            .await
            .unwrap();

        let json = result_json(&result);
        assert_eq!(json["results"].as_array().unwrap().len(), 1);
        assert_eq!(json["results"][0]["id"], "th_search123");
        mock.assert_async().await;
    }
}
