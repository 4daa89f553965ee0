use std::net::{IpAddr, Ipv4Addr};

use bon::bon;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::errors::ServerError;
use crate::graphql::ClientConfig;

mod states;

use states::Starting;

/// A Plain MCP Server
pub struct Server {
    transport: Transport,
    client_config: ClientConfig,
}

/// How MCP clients connect to the server
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transport {
    /// Use standard IO for server <> client communication
    #[default]
    Stdio,

    /// Host the MCP server on the supplied configuration, using streamable HTTP messages.
    StreamableHttp {
        /// The IP address to bind to
        #[serde(default = "Transport::default_address")]
        address: IpAddr,

        /// The port to bind to
        #[serde(default = "Transport::default_port")]
        port: u16,
    },
}

impl Transport {
    fn default_address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn default_port() -> u16 {
        5000
    }
}

#[bon]
impl Server {
    #[builder]
    pub fn new(transport: Transport, client_config: ClientConfig) -> Self {
        Self {
            transport,
            client_config,
        }
    }

    pub async fn start(self) -> Result<(), ServerError> {
        Starting {
            transport: self.transport,
            client_config: self.client_config,
        }
        .start()
        .await
    }
}
