//! Endpoint newtype
//!
//! This module defines a simple newtype around a Url for demarking the Plain
//! GraphQL endpoint. This allows overlaying validation and default behaviour
//! on top of the wrapped URL.

use std::ops::Deref;

use serde::Deserialize;
use url::Url;

/// A GraphQL endpoint
#[derive(Clone, Debug)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Unwrap the endpoint into its inner URL
    pub fn into_inner(self) -> Url {
        self.0
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self(defaults::endpoint())
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let url = Url::deserialize(deserializer)?;
        if matches!(url.scheme(), "http" | "https") {
            Ok(Self(url))
        } else {
            Err(serde::de::Error::custom(format!(
                "unsupported endpoint scheme `{}`, expected http or https",
                url.scheme()
            )))
        }
    }
}

impl Deref for Endpoint {
    type Target = Url;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

mod defaults {
    use plain_mcp_server::graphql::DEFAULT_ENDPOINT;
    use url::Url;

    pub(super) fn endpoint() -> Url {
        // SAFETY: This should always parse correctly and is considered a breaking
        // error otherwise. It is also explicitly tested in [tests::default_endpoint_parses_correctly]
        #[allow(clippy::unwrap_used)]
        Url::parse(DEFAULT_ENDPOINT).unwrap()
    }
}
