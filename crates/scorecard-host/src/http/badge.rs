use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

const SHIELDS_URL: &str = "https://img.shields.io/ossf-scorecard";
const BADGE_LABEL: &str = "openssf%20scorecard";

/// `GET /projects/{host}/{org}/{repo}/badge` — redirect to the badge
/// rendering service.
pub async fn handler(Path((host, org, repo)): Path<(String, String, String)>) -> Response {
    let location = format!("{SHIELDS_URL}/{host}/{org}/{repo}?label={BADGE_LABEL}");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
