//! Index, health, and embedded documentation endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::state::ServerState;

const OPENAPI_YAML: &str = include_str!("../../assets/openapi.yaml");
const DOCS_HTML: &str = include_str!("../../assets/docs.html");

/// `GET /` — JSON listing of the service's endpoints.
pub async fn index() -> Response {
    Json(json!({
        "endpoints": {
            "publish": "POST /projects/{host}/{org}/{repo}",
            "results": "GET /projects/{host}/{org}/{repo}?commit={sha}",
            "badge": "GET /projects/{host}/{org}/{repo}/badge",
            "docs": "GET /docs",
            "openapi": "GET /openapi.yaml",
            "health": "GET /healthz",
        }
    }))
    .into_response()
}

/// `GET /healthz`
pub async fn healthz(State(state): State<ServerState>) -> Response {
    let started_at = state.started_at.format(&Rfc3339).ok();
    let uptime = (OffsetDateTime::now_utc() - state.started_at).whole_seconds();
    Json(json!({
        "status": "ok",
        "started_at": started_at,
        "uptime_seconds": uptime,
    }))
    .into_response()
}

/// `GET /docs`
pub async fn docs() -> Response {
    Html(DOCS_HTML).into_response()
}

/// `GET /openapi.yaml`
pub async fn openapi() -> Response {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_YAML).into_response()
}
