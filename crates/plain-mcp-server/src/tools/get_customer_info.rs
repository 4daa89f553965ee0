use rmcp::model::{CallToolResult, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{require_non_blank, success, upstream_error};
use crate::errors::McpError;
use crate::graphql::{Client, Executable};
use crate::schema_from_type;

/// The name of the tool to look up a customer
pub const GET_CUSTOMER_INFO_TOOL_NAME: &str = "get_customer_info";

const GET_CUSTOMER: &str = r#"query GetCustomer($customerId: ID!) {
  customer(customerId: $customerId) {
    id
    fullName
    email {
      email
      isVerified
    }
    company {
      id
      name
      domainName
    }
    createdAt
    updatedAt
    tenantMemberships(first: 5) {
      edges {
        node {
          tenant {
            id
            name
          }
        }
      }
    }
  }
}"#;

#[derive(Clone)]
pub struct GetCustomerInfo {
    pub tool: Tool,
}

impl Default for GetCustomerInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Input for the get_customer_info tool.
#[derive(JsonSchema, Deserialize, Debug)]
pub struct Input {
    /// Customer ID to get info for
    customer_id: String,
}

impl Input {
    fn validate(mut self) -> Result<Self, McpError> {
        self.customer_id = require_non_blank("customer_id", &self.customer_id)?.to_string();
        Ok(self)
    }
}

impl GetCustomerInfo {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                GET_CUSTOMER_INFO_TOOL_NAME,
                "Get detailed information about a customer",
                schema_from_type!(Input),
            ),
        }
    }

    pub async fn execute(&self, client: &Client, input: Input) -> Result<CallToolResult, McpError> {
        let input = input.validate()?;
        Ok(match input.execute(client).await {
            Ok(customer) => success(&customer),
            Err(e) => upstream_error(e),
        })
    }
}

impl Executable for Input {
    fn operation(&self) -> &'static str {
        GET_CUSTOMER
    }

    fn operation_name(&self) -> &'static str {
        "GetCustomer"
    }

    fn variables(&self) -> Value {
        json!({ "customerId": self.customer_id })
    }

    fn shape(&self, mut data: Value) -> Value {
        data.get_mut("customer")
            .map(Value::take)
            .filter(|customer| !customer.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}
