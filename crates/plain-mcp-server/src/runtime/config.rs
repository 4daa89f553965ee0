use std::collections::HashMap;
use std::time::Duration;

use plain_mcp_server::{errors::ServerError, graphql::ClientConfig, server::Transport};
use reqwest::header::HeaderMap;
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use super::{endpoint::Endpoint, logging::Logging};

/// Environment variable conventionally holding the Plain API key
const PLAIN_API_KEY_ENV: &str = "PLAIN_API_KEY";

/// Configuration for the MCP server
#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// The Plain GraphQL endpoint
    #[schemars(schema_with = "Url::json_schema")]
    pub endpoint: Endpoint,

    /// The Plain API key, usually supplied through `PLAIN_API_KEY`
    #[schemars(with = "Option<String>")]
    pub api_key: Option<SecretString>,

    /// Timeout for each request to the Plain API (default: 30s)
    #[serde(
        deserialize_with = "humantime_serde::deserialize",
        default = "defaults::timeout"
    )]
    #[schemars(with = "Option<String>", default)]
    pub timeout: Duration,

    /// List of hard-coded headers to include in all GraphQL requests
    #[serde(deserialize_with = "parsers::map_from_str")]
    #[schemars(schema_with = "header_map")]
    pub headers: HeaderMap,

    /// Logging configuration
    pub logging: Logging,

    /// The type of server transport to use
    pub transport: Transport,
}

impl Config {
    /// Build the settings for the Plain API client, failing when no API key is configured
    pub fn client_config(&self) -> Result<ClientConfig, ServerError> {
        Ok(ClientConfig {
            endpoint: self.endpoint.clone().into_inner(),
            api_key: self
                .api_key
                .clone()
                .ok_or_else(|| ServerError::EnvironmentVariable(PLAIN_API_KEY_ENV.to_string()))?,
            timeout: self.timeout,
            headers: self.headers.clone(),
        })
    }
}

fn header_map(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    // Names and values are checked against HTTP header rules when parsed
    HashMap::<String, String>::json_schema(generator)
}

mod defaults {
    use std::time::Duration;

    use plain_mcp_server::graphql::DEFAULT_TIMEOUT;

    pub(super) const fn timeout() -> Duration {
        DEFAULT_TIMEOUT
    }
}

mod parsers {
    use std::str::FromStr;

    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use serde::Deserializer;

    pub(super) fn map_from_str<'de, D>(deserializer: D) -> Result<HeaderMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapFromStrVisitor;
        impl<'de> serde::de::Visitor<'de> for MapFromStrVisitor {
            type Value = HeaderMap;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a map of header string keys and values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut parsed = HeaderMap::with_capacity(map.size_hint().unwrap_or(0));

                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    let key = HeaderName::from_str(&key)
                        .map_err(|e| serde::de::Error::custom(e.to_string()))?;
                    let value = HeaderValue::from_str(&value)
                        .map_err(|e| serde::de::Error::custom(e.to_string()))?;

                    parsed.insert(key, value);
                }

                Ok(parsed)
            }
        }

        deserializer.deserialize_map(MapFromStrVisitor)
    }
}

#[cfg(test)]
mod test {
    use plain_mcp_server::errors::ServerError;
    use secrecy::ExposeSecret as _;

    use super::Config;

    #[test]
    fn it_parses_a_minimal_config() {
        let config = serde_json::from_str::<Config>("{}").unwrap();

        assert_eq!(config.timeout.as_secs(), 30);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn it_parses_headers() {
        let config = serde_json::from_str::<Config>(
            r#"{"headers": {"x-request-source": "agent", "X-Team": "support"}}"#,
        )
        .unwrap();

        assert_eq!(config.headers["x-request-source"], "agent");
        assert_eq!(config.headers["x-team"], "support");
    }

    #[test]
    fn it_rejects_invalid_header_names() {
        let error =
            serde_json::from_str::<Config>(r#"{"headers": {"bad header": "value"}}"#).unwrap_err();

        assert!(error.to_string().contains("invalid HTTP header name"));
    }

    #[test]
    fn it_requires_an_api_key() {
        let config = serde_json::from_str::<Config>("{}").unwrap();

        let error = config.client_config().unwrap_err();

        assert!(
            matches!(error, ServerError::EnvironmentVariable(ref name) if name == "PLAIN_API_KEY")
        );
    }

    #[test]
    fn it_builds_a_client_config() {
        let config = serde_json::from_str::<Config>(
            r#"{"api_key": "plainApiKey_123", "endpoint": "http://localhost:4000/graphql", "timeout": "2s"}"#,
        )
        .unwrap();

        let client_config = config.client_config().unwrap();

        assert_eq!(client_config.api_key.expose_secret(), "plainApiKey_123");
        assert_eq!(
            client_config.endpoint.as_str(),
            "http://localhost:4000/graphql"
        );
        assert_eq!(client_config.timeout.as_secs(), 2);
    }

    #[test]
    fn it_contains_no_keys_with_double_underscore() {
        // The env functionality of the config expansion uses __ as a split key
        // when determining nested fields of any of the fields of the Config.
        // This test ensures that a field name isn't added that can no longer be
        // configured using the env extractor.
        //
        // See [runtime::read_config]
        let schema = schemars::schema_for!(Config).to_value().to_string();

        assert!(!schema.contains("__"))
    }
}
