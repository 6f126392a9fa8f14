//! Read-path, badge, and service-surface scenarios.

mod common;

use common::*;
use std::collections::HashMap;

async fn bare_app() -> TestApp {
    TestApp::spawn(HashMap::new(), HashMap::new()).await
}

fn seed(dir: &std::path::Path, object: &str, bytes: &[u8]) {
    let path = dir.join(object);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn serves_results_from_the_primary_bucket() {
    let app = bare_app().await;
    seed(
        app.results_dir.path(),
        "github.com/foo/bar/results.json",
        br#"{"score":7}"#,
    );

    let response = app
        .client
        .get(app.url("/projects/github.com/foo/bar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), br#"{"score":7}"#);
}

#[tokio::test]
async fn commit_lookups_fall_back_to_the_cron_bucket() {
    let app = bare_app().await;
    seed(
        app.cron_dir.path(),
        "github.com/foo/bar/sha1/results.json",
        br#"{"score":5}"#,
    );

    let response = app
        .client
        .get(app.url("/projects/github.com/foo/bar?commit=sha1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), br#"{"score":5}"#);
}

#[tokio::test]
async fn missing_results_are_a_404() {
    let app = bare_app().await;
    let response = app
        .client
        .get(app.url("/projects/github.com/foo/bar"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn traversal_components_are_rejected() {
    let app = bare_app().await;
    let response = app
        .client
        .get(app.url("/projects/%2E%2E/github.com/foo"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn traversal_commits_are_rejected() {
    let app = bare_app().await;
    let response = app
        .client
        .get(app.url("/projects/github.com/foo/bar?commit=%2E%2E"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn badge_redirects_to_the_badge_service() {
    let app = bare_app().await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let response = client
        .get(app.url("/projects/github.com/foo/bar/badge"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 302);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "https://img.shields.io/ossf-scorecard/github.com/foo/bar?label=openssf%20scorecard"
    );
}

#[tokio::test]
async fn index_lists_the_endpoints() {
    let app = bare_app().await;
    let response = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["endpoints"]["publish"].as_str().unwrap().contains("/projects/"));
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = bare_app().await;

    let response = app.client.get(app.url("/healthz")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let response = app.client.get(app.url("/docs")).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(app.url("/openapi.yaml"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(
        response
            .text()
            .await
            .unwrap()
            .contains("OpenSSF Scorecard API")
    );
}
