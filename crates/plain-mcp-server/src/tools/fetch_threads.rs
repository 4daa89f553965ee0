use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{
    LIMIT_RANGE, ThreadStatus, connection_nodes, default_limit, require_in_range,
    require_non_blank, success, upstream_error,
};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to list support threads
pub const FETCH_THREADS_TOOL_NAME: &str = "fetch_threads";

const GET_THREADS: &str = r#"query GetThreads($filters: ThreadsFilter, $first: Int) {
  threads(filters: $filters, first: $first) {
    edges {
      node {
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
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}"#;

/// A tool to list support threads matching optional filters
#[derive(Clone)]
pub struct FetchThreads {
    pub tool: Tool,
}

impl Default for FetchThreads {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the fetch_threads tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Filter by thread status
    #[serde(default)]
    status: Option<ThreadStatus>,

    /// Filter by assigned user ID
    #[serde(default)]
    assignee_id: Option<String>,

    /// Filter by customer ID
    #[serde(default)]
    customer_id: Option<String>,

    /// Maximum number of threads to return
    #[serde(default = "default_limit")]
    limit: u32,

    /// Include resolved/done threads
    #[serde(default)]
    include_resolved: bool,
}

impl Input {
    fn validate(mut self) -> Result<Self, McpError> {
        require_in_range("limit", self.limit, LIMIT_RANGE)?;
        self.assignee_id = self
            .assignee_id
            .map(|id| require_non_blank("assignee_id", &id).map(str::to_string))
            .transpose()?;
        self.customer_id = self
            .customer_id
            .map(|id| require_non_blank("customer_id", &id).map(str::to_string))
            .transpose()?;
        Ok(self)
    }

    /// The statuses to keep. An explicit status always wins over `include_resolved`.
    fn statuses(&self) -> Option<Vec<ThreadStatus>> {
        match (self.status, self.include_resolved) {
            (Some(status), _) => Some(vec![status]),
            (None, false) => Some(vec![ThreadStatus::Todo, ThreadStatus::Snoozed]),
            (None, true) => None,
        }
    }
}

impl FetchThreads {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                FETCH_THREADS_TOOL_NAME,
                "Fetch support threads (tickets) with optional filters. By default only open (TODO or SNOOZED) threads are returned.",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        let input = input.validate()?;
        Ok(match input.execute(client).await {
            Ok(threads) => success(&threads),
            Err(e) => upstream_error(e),
        })
    }
}

impl Executable for Input {
    fn operation(&self) -> &'static str {
        GET_THREADS
    }

    fn operation_name(&self) -> &'static str {
        "GetThreads"
    }

    fn variables(&self) -> Value {
        let mut filters = Map::new();
        if let Some(statuses) = self.statuses() {
            filters.insert("status".to_string(), json!({ "isIn": statuses }));
        }
        if let Some(assignee_id) = &self.assignee_id {
            filters.insert(
                "assignedToUser".to_string(),
                json!({ "userId": assignee_id }),
            );
        }
        if let Some(customer_id) = &self.customer_id {
            filters.insert("customerId".to_string(), json!(customer_id));
        }

        let mut variables = Map::new();
        if !filters.is_empty() {
            variables.insert("filters".to_string(), Value::Object(filters));
        }
        variables.insert("first".to_string(), json!(self.limit));
        Value::Object(variables)
    }

    fn shape(&self, data: Value) -> Value {
        let threads = data.get("threads");
        let page_info = threads.and_then(|threads| threads.get("pageInfo"));
        json!({
            "threads": connection_nodes(threads),
            "hasMore": page_info
                .and_then(|page_info| page_info.get("hasNextPage"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            "endCursor": page_info
                .and_then(|page_info| page_info.get("endCursor"))
                .cloned()
                .unwrap_or(Value::Null),
        })
    }
}
