use std::net::SocketAddr;

use rmcp::transport::StreamableHttpService;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::{ServiceExt as _, transport::stdio};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::{
    errors::ServerError,
    graphql::{Client, ClientConfig},
    server::Transport,
};

use super::{running::Running, shutdown_signal};

pub(in crate::server) struct Starting {
    pub(in crate::server) transport: Transport,
    pub(in crate::server) client_config: ClientConfig,
}

impl Starting {
    /// Serve MCP requests until the transport closes or the process is asked to stop
    pub(in crate::server) async fn start(self) -> Result<(), ServerError> {
        let client = Client::new(self.client_config)?;
        info!(endpoint = %client.endpoint(), "Using Plain GraphQL endpoint");
        let running = Running::new(client);

        match self.transport {
            Transport::StreamableHttp { address, port } => {
                info!(port = ?port, address = ?address, "Starting MCP server in Streamable HTTP mode");
                let listen_address = SocketAddr::new(address, port);
                let service = StreamableHttpService::new(
                    move || Ok(running.clone()),
                    LocalSessionManager::default().into(),
                    Default::default(),
                );
                let router = axum::Router::new()
                    .nest_service("/mcp", service)
                    .layer(TraceLayer::new_for_http());

                let cancellation_token = CancellationToken::new();
                let shutdown = cancellation_token.clone();
                tokio::spawn(async move {
                    shutdown_signal().await;
                    info!("Shutting down MCP server");
                    shutdown.cancel();
                });

                let tcp_listener = tokio::net::TcpListener::bind(listen_address).await?;
                axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(cancellation_token.cancelled_owned())
                    .await?;
            }
            Transport::Stdio => {
                info!("Starting MCP server in stdio mode");
                let service = running
                    .serve(stdio())
                    .await
                    .inspect_err(|e| {
                        error!("serving error: {:?}", e);
                    })
                    .map_err(|e| ServerError::Serve(e.to_string()))?;

                tokio::select! {
                    quit_reason = service.waiting() => {
                        let quit_reason = quit_reason.map_err(ServerError::StartupError)?;
                        info!(?quit_reason, "MCP client disconnected");
                    }
                    _ = shutdown_signal() => info!("Shutting down MCP server"),
                }
            }
        }

        Ok(())
    }
}
