//! Network module with deferred startup lifecycle.
//!
//! `new()` assembles configuration and the identity filter, `start()` binds
//! the TCP listener, and `serve()` starts accepting connections.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::handlers::{health_handler, liveness_handler, whoami_handler, AppState};
use super::middleware::build_http_layers;
use crate::access::TsidLayer;

/// Manages the HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- holds configuration and the identity filter
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    tsid: TsidLayer,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, tsid: TsidLayer) -> Self {
        Self {
            config,
            tsid,
            listener: None,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /whoami` -- published identity vars (behind the filter)
    /// - `GET /health` -- health JSON
    /// - `GET /health/live` -- liveness check
    ///
    /// The filter is a route layer on the content routes, so it runs after
    /// the transport layers and before any handler that produces content.
    pub fn build_router(&self) -> Router {
        build_router(&self.config, self.tsid.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// Peer addresses reach the filter through `ConnectInfo<SocketAddr>`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = build_router(&self.config, self.tsid);

        info!("Serving HTTP connections");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!("Server stopped");
        Ok(())
    }
}

fn build_router(config: &NetworkConfig, tsid: TsidLayer) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    };

    Router::new()
        .route("/whoami", get(whoami_handler))
        .route_layer(tsid)
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .layer(build_http_layers(config))
        .with_state(state)
}
