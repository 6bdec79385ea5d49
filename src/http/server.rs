//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the forwarding fallback
//! - Wire up middleware (request ID, tracing, timeout, origin guard, gate)
//! - Bind the server to a listener
//! - Apply `[auth]` updates from the config watcher while running

use axum::{middleware, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{AuthManager, AuthorizationGate, ResourceParserRegistry, StaticAuthManager};
use crate::config::{GateConfig, SecurityConfig};
use crate::http::middleware::{gate_middleware, origin_guard};
use crate::http::proxy::{forward_handler, Upstream};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::routing::{RouteError, RouteTable};

/// Errors raised while assembling the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid route: {0}")]
    Route(#[from] RouteError),

    #[error("invalid upstream address {0:?}")]
    Upstream(String),
}

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
    pub upstream: Upstream,
    pub security: SecurityConfig,
}

/// HTTP front door: gate every request, forward the allowed ones.
pub struct GateServer {
    router: Router,
    gate: Arc<AuthorizationGate>,
    users: Option<Arc<StaticAuthManager>>,
}

impl GateServer {
    /// Create a server backed by a [`StaticAuthManager`] built from `[auth.users]`.
    pub fn new(config: GateConfig) -> Result<Self, ServerError> {
        let users = Arc::new(StaticAuthManager::from_config(&config.auth.users));
        let mut server = Self::with_auth_manager(config, users.clone())?;
        server.users = Some(users);
        Ok(server)
    }

    /// Create a server with a caller-supplied identity backend.
    pub fn with_auth_manager(
        config: GateConfig,
        manager: Arc<dyn AuthManager>,
    ) -> Result<Self, ServerError> {
        let routes = Arc::new(RouteTable::from_config(config.routes.clone())?);
        let parsers = Arc::new(ResourceParserRegistry::new());
        let gate = Arc::new(AuthorizationGate::new(
            config.auth.clone(),
            routes,
            parsers,
            manager,
        ));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let upstream = Upstream::new(&config.upstream.address, client)
            .ok_or_else(|| ServerError::Upstream(config.upstream.address.clone()))?;

        let state = AppState {
            gate: gate.clone(),
            upstream,
            security: config.security.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            gate,
            users: None,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers run outermost first: request ID, trace, timeout, response ID,
    /// origin guard, gate.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        Router::new()
            .fallback(forward_handler)
            .layer(middleware::from_fn_with_state(state.clone(), gate_middleware))
            .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The gate shared with the request pipeline.
    pub fn gate(&self) -> Arc<AuthorizationGate> {
        self.gate.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configs arriving on `config_updates` replace the live `[auth]`
    /// section, including the bundled user table. Routes and upstream are
    /// fixed for the server's lifetime.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gate server starting");

        let gate = self.gate.clone();
        let users = self.users.clone();
        let reload = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                tracing::info!(
                    enabled = config.auth.enabled,
                    users = config.auth.users.len(),
                    "Applying auth config update"
                );
                if let Some(users) = &users {
                    users.reload(&config.auth.users);
                }
                gate.update_config(config.auth);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reload.abort();
        tracing::info!("Gate server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[tokio::test]
    async fn test_new_rejects_bad_upstream() {
        let mut config = GateConfig::default();
        config.upstream.address = "not an authority".into();
        assert!(matches!(GateServer::new(config), Err(ServerError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_new_rejects_bad_route() {
        let mut config = GateConfig::default();
        config.routes.push(RouteConfig {
            name: "broken".into(),
            method: Some("NOT A METHOD".into()),
            path: "/nacos/v1/cs/configs".into(),
            priority: 0,
            permission: None,
        });
        assert!(matches!(GateServer::new(config), Err(ServerError::Route(_))));
    }
}
