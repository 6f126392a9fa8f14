use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use scorecard_core::ServerConfig;
use tokio::net::TcpListener;

use crate::http::{badge, meta, publish, results};
use crate::state::ServerState;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(meta::index))
        .route("/healthz", get(meta::healthz))
        .route("/docs", get(meta::docs))
        .route("/openapi.yaml", get(meta::openapi))
        .route(
            "/projects/{host}/{org}/{repo}",
            get(results::handler).post(publish::handler),
        )
        .route("/projects/{host}/{org}/{repo}/badge", get(badge::handler))
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<()> {
    let state = ServerState::new(config)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = router(state);

    tracing::info!(addr = %addr, "starting scorecard webapp");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .await
        .context("serving HTTP")?;
    Ok(())
}
