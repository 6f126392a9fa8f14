//! End-to-end publish scenarios over a live listener with mocked upstreams.

mod common;

use common::*;
use serde_json::json;

fn submission(branch: &str) -> serde_json::Value {
    json!({
        "result": PAYLOAD,
        "branch": branch,
        "tlogIndex": TLOG_INDEX,
    })
}

#[tokio::test]
async fn happy_path_publishes_to_both_canonical_paths() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", CONFORMING_WORKFLOW)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let latest = app.results_dir.path().join("github.com/foo/bar/results.json");
    let qualified = app
        .results_dir
        .path()
        .join(format!("github.com/foo/bar/{WORKFLOW_SHA}/results.json"));
    assert_eq!(std::fs::read(&latest).unwrap(), PAYLOAD.as_bytes());
    assert_eq!(std::fs::read(&qualified).unwrap(), PAYLOAD.as_bytes());
}

#[tokio::test]
async fn happy_path_resolves_by_payload_hash_when_index_is_absent() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", CONFORMING_WORKFLOW)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&json!({"result": PAYLOAD, "branch": "main"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    assert!(
        app.tlog
            .calls()
            .contains(&"/api/v1/index/retrieve".to_string())
    );
}

#[tokio::test]
async fn mismatched_branch_is_rejected_with_the_docs_link() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", CONFORMING_WORKFLOW)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("dev"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Workflow validation failed, see"));
    assert!(message.contains("#workflow-restrictions"));
}

#[tokio::test]
async fn stale_default_branch_is_rejected() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("master", CONFORMING_WORKFLOW)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("default branch"));
}

#[tokio::test]
async fn imposter_commit_is_rejected() {
    let imposter = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
    let workflow = CONFORMING_WORKFLOW.replace(
        "actions/checkout@v4",
        &format!("actions/checkout@{imposter}"),
    );

    let mut forge = forge_routes("main", &workflow);
    // Membership probes: no tags, no releases, default-branch compare 404s.
    forge.insert(
        "/repos/actions/checkout/tags?per_page=100".to_string(),
        (200, "[]".to_string()),
    );
    forge.insert(
        "/repos/actions/checkout".to_string(),
        (200, r#"{"default_branch":"main"}"#.to_string()),
    );
    forge.insert(
        "/repos/actions/checkout/releases?per_page=100".to_string(),
        (200, "[]".to_string()),
    );

    let app = TestApp::spawn(tlog_routes(), forge).await;
    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("imposter commit"));
}

#[tokio::test]
async fn policy_violation_in_the_workflow_is_rejected() {
    let workflow = CONFORMING_WORKFLOW.replace("permissions: read-all", "permissions: write-all");
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", &workflow)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("write-all"));
}

#[tokio::test]
async fn payload_mismatch_is_rejected() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", CONFORMING_WORKFLOW)).await;

    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&json!({"result": r#"{"score":8}"#, "branch": "main", "tlogIndex": TLOG_INDEX}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("does not match"));
}

#[tokio::test]
async fn non_hashedrekord_entries_are_rejected() {
    let record = json!({
        "apiVersion": "0.0.1",
        "kind": "rekord",
        "spec": {
            "data": {"hash": {"algorithm": "sha256", "value": "00"}},
            "signature": {"content": "c2ln", "publicKey": {"content": "cGVt"}}
        }
    });
    let mut tlog = tlog_routes();
    tlog.insert(
        format!("/api/v1/log/entries?logIndex={TLOG_INDEX}"),
        (200, entry_with_body(&record)),
    );

    let app = TestApp::spawn(tlog, forge_routes("main", CONFORMING_WORKFLOW)).await;
    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("rekord"));
}

#[tokio::test]
async fn transparency_log_outage_is_an_internal_error() {
    let mut tlog = tlog_routes();
    tlog.insert(
        format!("/api/v1/log/entries?logIndex={TLOG_INDEX}"),
        (500, r#"{"message":"boom"}"#.to_string()),
    );

    let app = TestApp::spawn(tlog, forge_routes("main", CONFORMING_WORKFLOW)).await;
    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .json(&submission("main"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    // Operational details never leak to the client.
    assert_eq!(
        body["message"].as_str().unwrap(),
        "something went wrong and we are looking into it."
    );
}

#[tokio::test]
async fn invalid_json_bodies_are_rejected() {
    let app = TestApp::spawn(tlog_routes(), forge_routes("main", CONFORMING_WORKFLOW)).await;
    let response = app
        .client
        .post(app.url("/projects/github.com/foo/bar"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
