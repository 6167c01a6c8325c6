//! Axum-based RPC server.

use crate::handlers;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use zkauth_store::SessionStore;
use zkauth_verification::{ChallengeBuilder, ResponseHandler, StatusQuery};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Largest accepted callback body.
    #[serde(default = "default_body_limit_bytes")]
    pub body_limit_bytes: usize,
    /// Front-end served at `/`.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Accept `?sessionId=` on `/api/sign-in`.
    #[serde(default)]
    pub allow_client_session_ids: bool,
}

fn default_body_limit_bytes() -> usize {
    512 * 1024
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            body_limit_bytes: default_body_limit_bytes(),
            static_dir: None,
            allow_client_session_ids: false,
        }
    }
}

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub challenges: Arc<ChallengeBuilder>,
    pub responses: ResponseHandler,
    pub status: StatusQuery,
    pub allow_client_session_ids: bool,
}

pub fn router(state: AppState, config: &RpcConfig) -> Router {
    let callback = post(handlers::callback)
        .layer::<_, std::convert::Infallible>(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

    let api = Router::new()
        .route("/sign-in", get(handlers::sign_in))
        .route("/callback", callback)
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([handlers::SESSION_ID_HEADER]);

    let app = Router::new().nest("/api", api);
    let app = match &config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.layer(TraceLayer::new_for_http()).layer(cors)
}

pub struct RpcServer {
    pub listener: tokio::net::TcpListener,
    pub app: Router,
}

impl RpcServer {
    pub async fn bind(addr: &str, app: Router) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        Ok(Self { listener, app })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = ?self.listener.local_addr().ok(), "RPC server listening");
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
