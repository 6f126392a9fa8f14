//! Shared harness: a mock transparency log, a mock source-host API, and a
//! fully wired server over filesystem-backed buckets.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scorecard_core::config::{ServerConfig, TrustOverrides};
use scorecard_host::{ServerState, router};
use tempfile::TempDir;
use tiny_http::{Header, Response, Server};
use url::Url;

/// Entry ID of the checked-in log entry (tree-ID prefix + leaf hash).
pub const ENTRY_ID: &str =
    "108e9186e8c5677adddfaaf5b6a5722374ca8e95c4a2b147602649c653ae440ef00d8f461dc6f5c1";
/// The payload the checked-in entry commits to.
pub const PAYLOAD: &str = r#"{"score":7}"#;
/// Commit recorded in the fixture certificate.
pub const WORKFLOW_SHA: &str = "8d375655c83fb89851e1d486d7171f5c54f238a5";
pub const TLOG_INDEX: i64 = 23652179;

pub const ENTRY_JSON: &str = include_str!("../fixtures/entry.json");

/// A workflow that passes every policy rule without needing membership
/// lookups (tag pins are not 40-hex commit hashes).
pub const CONFORMING_WORKFLOW: &str = r#"
name: Scorecards supply-chain security
on:
  push:
    branches: [main]
permissions: read-all
jobs:
  analysis:
    runs-on: ubuntu-latest
    permissions:
      id-token: write
    steps:
      - uses: actions/checkout@v4
      - uses: ossf/scorecard-action@v2
      - uses: actions/upload-artifact@v4
"#;

/// Route table: full URL (path + query) to (status, body).
pub type Routes = HashMap<String, (u16, String)>;

pub struct MockServer {
    pub base: Url,
    calls: Arc<Mutex<Vec<String>>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start(routes: Routes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::from_listener(listener, None).expect("start mock server"));
        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let thread_server = Arc::clone(&server);
        let thread_calls = Arc::clone(&calls);
        let handle = std::thread::spawn(move || {
            while let Ok(request) = thread_server.recv() {
                let url = request.url().to_string();
                thread_calls.lock().unwrap().push(url.clone());
                let (status, body) = routes
                    .get(&url)
                    .cloned()
                    .unwrap_or((404, "{}".to_string()));
                let header = Header::from_bytes("content-type", "application/json").unwrap();
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base,
            calls,
            server,
            handle: Some(handle),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub results_dir: TempDir,
    pub cron_dir: TempDir,
    pub tlog: MockServer,
    pub forge: MockServer,
}

impl TestApp {
    pub async fn spawn(tlog_routes: Routes, forge_routes: Routes) -> Self {
        let tlog = MockServer::start(tlog_routes);
        let forge = MockServer::start(forge_routes);
        let results_dir = TempDir::new().expect("results dir");
        let cron_dir = TempDir::new().expect("cron dir");

        let config = ServerConfig {
            results_bucket: format!("file://{}", results_dir.path().display()),
            cron_bucket: format!("file://{}", cron_dir.path().display()),
            tlog_url: tlog.base.clone(),
            forge_api_url: forge.base.clone(),
            http_timeout: Duration::from_secs(5),
            request_deadline: Duration::from_secs(30),
            trust_overrides: TrustOverrides::default(),
            port: 0,
        };
        let state = ServerState::new(config).expect("server state");
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind app listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .await
                .expect("serve app");
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            results_dir,
            cron_dir,
            tlog,
            forge,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Standard transparency-log routes serving the checked-in entry.
pub fn tlog_routes() -> Routes {
    HashMap::from([
        (
            "/api/v1/index/retrieve".to_string(),
            (200, format!(r#"["{ENTRY_ID}"]"#)),
        ),
        (
            format!("/api/v1/log/entries/{ENTRY_ID}"),
            (200, ENTRY_JSON.to_string()),
        ),
        (
            format!("/api/v1/log/entries?logIndex={TLOG_INDEX}"),
            (200, ENTRY_JSON.to_string()),
        ),
    ])
}

/// Source-host routes for the fixture repository serving `workflow`.
pub fn forge_routes(default_branch: &str, workflow: &str) -> Routes {
    HashMap::from([
        (
            "/repos/foo/bar".to_string(),
            (
                200,
                format!(r#"{{"default_branch":"{default_branch}"}}"#),
            ),
        ),
        (
            format!("/repos/foo/bar/contents/.github/workflows/scorecards.yml?ref={WORKFLOW_SHA}"),
            (200, contents_json(workflow)),
        ),
    ])
}

pub fn contents_json(content: &str) -> String {
    format!(
        r#"{{"type":"file","encoding":"base64","content":"{}"}}"#,
        STANDARD.encode(content)
    )
}

/// The fixture entry with its body swapped, to exercise pre-proof stages.
pub fn entry_with_body(body: &serde_json::Value) -> String {
    let mut entry: serde_json::Value = serde_json::from_str(ENTRY_JSON).unwrap();
    let encoded = STANDARD.encode(serde_json::to_vec(body).unwrap());
    entry[ENTRY_ID]["body"] = serde_json::Value::String(encoded);
    entry.to_string()
}
