use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::publish::{self, PublishError, SubmittedReport};
use crate::state::ServerState;

use super::{error_response, internal_error};

/// `POST /projects/{host}/{org}/{repo}`
pub async fn handler(
    State(state): State<ServerState>,
    Path((host, org, repo)): Path<(String, String, String)>,
    payload: Result<Json<SubmittedReport>, JsonRejection>,
) -> Response {
    let Json(report) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("error parsing input JSON: {rejection}"),
            );
        }
    };

    let deadline = state.config.request_deadline;
    let outcome =
        tokio::time::timeout(deadline, publish::process(&state, &host, &org, &repo, &report))
            .await;

    match outcome {
        Ok(Ok(())) => (
            StatusCode::CREATED,
            "successfully verified and published ScorecardResult",
        )
            .into_response(),
        Ok(Err(PublishError::Reject(reason))) => {
            tracing::info!(host, org, repo, %reason, "rejected submission");
            error_response(StatusCode::BAD_REQUEST, publish::rejection_message(&reason))
        }
        Ok(Err(PublishError::Internal(err))) => {
            tracing::error!(host, org, repo, error = ?err, "publish pipeline failed");
            internal_error()
        }
        Err(_elapsed) => {
            tracing::error!(host, org, repo, "publish pipeline hit the request deadline");
            internal_error()
        }
    }
}
