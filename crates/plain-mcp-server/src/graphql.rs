//! Execute GraphQL operations against the Plain API

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::{Map, Value, json};
use tracing::{debug, error};
use url::Url;

use crate::errors::{GraphQLError, MAX_ERROR_BODY_CHARS, truncate};

/// The Plain GraphQL endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "https://core-api.uk.plain.com/graphql/v1";

/// The HTTP timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GraphQL error codes that mean the API key was rejected
const AUTHENTICATION_ERROR_CODES: &[&str] = &["UNAUTHENTICATED", "FORBIDDEN"];

/// Connection settings for the upstream GraphQL API
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub api_key: SecretString,
    pub timeout: Duration,
    /// Extra headers sent with every request
    pub headers: HeaderMap,
}

/// A GraphQL client authenticated with a bearer API key
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
}

/// A single GraphQL request
#[derive(Debug)]
pub struct Request<'a> {
    pub query: &'a str,
    pub operation_name: Option<&'a str>,
    pub variables: Value,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, GraphQLError> {
        let mut headers = config.headers;
        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|_| GraphQLError::InvalidApiKey)?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("plain-mcp-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(GraphQLError::Client)?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send a request and return its `data` object
    pub async fn execute(&self, request: Request<'_>) -> Result<Value, GraphQLError> {
        let operation = request.operation_name.unwrap_or("<anonymous>");
        debug!(operation, "Sending GraphQL request");

        let variables = match request.variables {
            Value::Null => Value::Object(Map::new()),
            variables => variables,
        };
        let mut body = json!({
            "query": request.query,
            "variables": variables,
        });
        if let (Some(name), Some(obj)) = (request.operation_name, body.as_object_mut()) {
            obj.insert("operationName".to_string(), Value::String(name.to_string()));
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(operation, "HTTP error executing query: {e}");
                GraphQLError::Network(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(operation, "Failed to read GraphQL response body: {e}");
            GraphQLError::Network(e)
        })?;

        parse_response(status, &text).inspect_err(|e| {
            error!(operation, kind = e.kind(), "Error executing query: {e}");
        })
    }
}

/// Normalize an HTTP response from the GraphQL endpoint into its `data` object
fn parse_response(status: StatusCode, text: &str) -> Result<Value, GraphQLError> {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(GraphQLError::Authentication {
            status: status.as_u16(),
            message: serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|envelope| error_messages(&envelope).into_iter().next())
                .unwrap_or_else(|| truncate(text, MAX_ERROR_BODY_CHARS)),
        });
    }

    if !status.is_success() {
        return Err(GraphQLError::Http {
            status: status.as_u16(),
            body: truncate(text, MAX_ERROR_BODY_CHARS),
        });
    }

    let envelope: Value = serde_json::from_str(text)
        .map_err(|e| GraphQLError::InvalidResponse(format!("{e}")))?;
    if !envelope.is_object() {
        return Err(GraphQLError::InvalidResponse(
            "expected a JSON object".to_string(),
        ));
    }

    let messages = error_messages(&envelope);
    if !messages.is_empty() {
        if has_authentication_code(&envelope) {
            return Err(GraphQLError::Unauthenticated { messages });
        }
        return Err(GraphQLError::GraphQL { messages });
    }

    Ok(match envelope.get("data") {
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(data) => data.clone(),
    })
}

fn error_messages(envelope: &Value) -> Vec<String> {
    envelope
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|error| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn has_authentication_code(envelope: &Value) -> bool {
    envelope
        .get("errors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|error| error.pointer("/extensions/code").and_then(Value::as_str))
        .any(|code| AUTHENTICATION_ERROR_CODES.contains(&code))
}

/// Able to be executed as a GraphQL operation
pub trait Executable {
    /// Get the operation document
    fn operation(&self) -> &'static str;

    /// Get the operation name
    fn operation_name(&self) -> &'static str;

    /// Get the variables to execute the operation with
    fn variables(&self) -> Value;

    /// Reshape the `data` returned by the API into the tool result
    fn shape(&self, data: Value) -> Value {
        data
    }

    /// Execute as a GraphQL operation using the client
    async fn execute(&self, client: &Client) -> Result<Value, GraphQLError> {
        let data = client
            .execute(Request {
                query: self.operation(),
                operation_name: Some(self.operation_name()),
                variables: self.variables(),
            })
            .await?;
        Ok(self.shape(data))
    }
}

#[cfg(test)]
pub(crate) fn test_client(endpoint: &str) -> Client {
    Client::new(ClientConfig {
        endpoint: Url::parse(endpoint).unwrap(),
        api_key: SecretString::from("test_api_key_123"),
        timeout: Duration::from_secs(5),
        headers: HeaderMap::new(),
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use rstest::rstest;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn execute_sends_bearer_token_and_returns_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer test_api_key_123")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "query": "query Test($id: ID!) { test(id: $id) }",
                "operationName": "Test",
                "variables": {"id": "123"},
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"test": "result"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client
            .execute(Request {
                query: "query Test($id: ID!) { test(id: $id) }",
                operation_name: Some("Test"),
                variables: json!({"id": "123"}),
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"test": "result"}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn execute_without_variables_sends_empty_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {}})))
            .with_status(200)
            .with_body(r#"{"data": {"test": "result"}}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client
            .execute(Request {
                query: "{ test }",
                operation_name: None,
                variables: Value::Null,
            })
            .await
            .unwrap();

        assert_eq!(result, json!({"test": "result"}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn execute_reports_connection_failures_as_network_errors() {
        // Nothing listens on port 1
        let client = test_client("http://127.0.0.1:1/graphql");
        let error = client
            .execute(Request {
                query: "{ test }",
                operation_name: None,
                variables: Value::Null,
            })
            .await
            .unwrap_err();

        assert_eq!(error.kind(), "network");
        assert!(error.to_string().starts_with("HTTP error"));
    }

    #[traced_test]
    #[tokio::test]
    async fn execute_logs_upstream_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let _ = client
            .execute(Request {
                query: "{ test }",
                operation_name: Some("Test"),
                variables: Value::Null,
            })
            .await;

        assert!(logs_contain("Error executing query"));
        assert!(logs_contain("HTTP error (502): Bad Gateway"));
    }

    #[test]
    fn graphql_errors_are_normalized() {
        let body = json!({
            "errors": [
                {"message": "Field 'test' not found"},
                {"path": ["test"]},
            ]
        })
        .to_string();

        let error = parse_response(StatusCode::OK, &body).unwrap_err();

        assert_eq!(error.kind(), "graphql");
        assert_eq!(
            error.to_string(),
            r#"GraphQL errors: Field 'test' not found; {"path":["test"]}"#
        );
    }

    #[rstest]
    #[case("UNAUTHENTICATED")]
    #[case("FORBIDDEN")]
    fn unauthenticated_graphql_error_is_an_authentication_error(#[case] code: &str) {
        let body = json!({
            "errors": [{
                "message": "Invalid API key",
                "extensions": {"code": code},
            }]
        })
        .to_string();

        let error = parse_response(StatusCode::OK, &body).unwrap_err();

        assert_eq!(error.kind(), "authentication");
        assert_eq!(error.status(), None);
        assert_eq!(error.to_string(), "Authentication failed: Invalid API key");
        assert!(error.to_payload()["error"].get("status").is_none());
    }

    #[rstest]
    #[case(StatusCode::UNAUTHORIZED)]
    #[case(StatusCode::FORBIDDEN)]
    fn rejected_credentials_are_authentication_errors(#[case] status: StatusCode) {
        let body = json!({"errors": [{"message": "Not authorized"}]}).to_string();

        let error = parse_response(status, &body).unwrap_err();

        assert_eq!(error.kind(), "authentication");
        assert_eq!(error.status(), Some(status.as_u16()));
        assert!(error.to_string().ends_with("Not authorized"));
    }

    #[test]
    fn server_errors_are_http_errors_with_truncated_body() {
        let body = "x".repeat(2000);

        let error = parse_response(StatusCode::INTERNAL_SERVER_ERROR, &body).unwrap_err();

        match error {
            GraphQLError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS + 3);
            }
            other => panic!("Expected GraphQLError::Http, got {other:?}"),
        }
    }

    #[rstest]
    #[case("not json")]
    #[case("[1, 2, 3]")]
    fn malformed_bodies_are_invalid_responses(#[case] body: &str) {
        let error = parse_response(StatusCode::OK, body).unwrap_err();

        assert_eq!(error.kind(), "invalid_response");
    }

    #[rstest]
    #[case(r#"{}"#)]
    #[case(r#"{"data": null}"#)]
    #[case(r#"{"data": null, "errors": []}"#)]
    fn missing_data_is_an_empty_object(#[case] body: &str) {
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), json!({}));
    }
}
