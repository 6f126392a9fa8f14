use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use scorecard_core::paths;

use crate::state::ServerState;

use super::{error_response, internal_error};

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    #[serde(default)]
    pub commit: Option<String>,
}

/// `GET /projects/{host}/{org}/{repo}[?commit=sha]`
///
/// Looks up the sanitized object in the primary bucket, then falls back to
/// the cron bucket; a miss in both is a 404.
pub async fn handler(
    State(state): State<ServerState>,
    Path((host, org, repo)): Path<(String, String, String)>,
    Query(query): Query<ResultsQuery>,
) -> Response {
    let object = match paths::sanitize_result_path(&host, &org, &repo, query.commit.as_deref()) {
        Ok(object) => object,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    tracing::debug!(object = %object, "querying result buckets");

    for bucket in [&state.config.results_bucket, &state.config.cron_bucket] {
        match state.stores.read(bucket, &object).await {
            Ok(bytes) => {
                return (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    bytes,
                )
                    .into_response();
            }
            Err(err) if err.is_not_found() => continue,
            Err(err) => {
                tracing::error!(bucket = %bucket, object = %object, error = %err, "bucket read failed");
                return internal_error();
            }
        }
    }
    error_response(StatusCode::NOT_FOUND, format!("result for {org}/{repo} not found"))
}
