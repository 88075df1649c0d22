//! HTTP + WebSocket surface, served from a single listener.
//!
//! Routes:
//!   GET  /python      — WebSocket upgrade, relayed to a language server
//!   GET  /code        — contents of the workspace code file
//!   POST /code        — overwrite the code file
//!   PUT  /code        — overwrite, execute, return captured output
//!   POST /createFile  — create the scratch file if absent
//!   GET  /health      — JSON liveness document

pub mod relay;
pub mod routes;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::AppContext;

pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening (HTTP + WebSocket on one port)");

    let router = build_router(ctx);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config);
    Router::new()
        .route("/python", get(relay::ws_upgrade))
        .route(
            "/code",
            get(routes::read_code)
                .post(routes::save_code)
                .put(routes::run_code),
        )
        .route("/createFile", post(routes::create_file))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(ctx)
}

/// Permissive by default (any origin, like the original deployment behind a
/// browser editor); an allowlist in config tightens it.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(Duration::from_secs(1000))
}

/// Resolves when a shutdown signal is received.
///
/// On Unix we listen for SIGTERM *and* Ctrl-C.
/// On other platforms we listen for Ctrl-C only.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    info!("shutdown signal received");
}
