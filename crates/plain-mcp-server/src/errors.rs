use reqwest::StatusCode;
use rmcp::model::ErrorCode;
use serde_json::json;
use tokio::task::JoinError;

/// Maximum number of characters of an upstream error body kept in an error
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 500;

/// An error talking to the upstream GraphQL API
#[derive(Debug, thiserror::Error)]
pub enum GraphQLError {
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// Credentials rejected inside a successful GraphQL response
    #[error("Authentication failed: {}", messages.join("; "))]
    Unauthenticated { messages: Vec<String> },

    #[error("GraphQL errors: {}", messages.join("; "))]
    GraphQL { messages: Vec<String> },

    #[error("HTTP error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response from GraphQL endpoint: {0}")]
    InvalidResponse(String),

    #[error("Could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("API key contains characters that are not allowed in an HTTP header")]
    InvalidApiKey,
}

impl GraphQLError {
    /// The machine-readable category reported back to the calling agent
    pub fn kind(&self) -> &'static str {
        match self {
            GraphQLError::Authentication { .. }
            | GraphQLError::Unauthenticated { .. }
            | GraphQLError::InvalidApiKey => "authentication",
            GraphQLError::GraphQL { .. } => "graphql",
            GraphQLError::Network(_) => "network",
            GraphQLError::Http { .. } => "http",
            GraphQLError::InvalidResponse(_) => "invalid_response",
            GraphQLError::Client(_) => "client",
        }
    }

    /// The HTTP status that caused the error, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GraphQLError::Authentication { status, .. } | GraphQLError::Http { status, .. } => {
                Some(*status)
            }
            GraphQLError::Network(e) => e.status().as_ref().map(StatusCode::as_u16),
            _ => None,
        }
    }

    /// Structured payload describing the error
    pub fn to_payload(&self) -> serde_json::Value {
        let mut error = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let (Some(status), Some(obj)) = (self.status(), error.as_object_mut()) {
            obj.insert("status".to_string(), json!(status));
        }
        json!({ "error": error })
    }
}

/// An error in server initialization
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Could not create GraphQL client: {0}")]
    Client(#[from] GraphQLError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing environment variable: {0}")]
    EnvironmentVariable(String),

    #[error("Failed to start server")]
    StartupError(#[from] JoinError),

    #[error("Failed to serve MCP over stdio: {0}")]
    Serve(String),
}

/// An MCP tool error
pub type McpError = rmcp::model::ErrorData;

/// Reject a tool call before anything is sent upstream
pub fn validation_error(message: impl Into<String>) -> McpError {
    let message = message.into();
    McpError::new(
        ErrorCode::INVALID_PARAMS,
        message.clone(),
        Some(json!({ "kind": "validation", "message": message })),
    )
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", text.get(..index).unwrap_or(text)),
        None => text.to_string(),
    }
}
