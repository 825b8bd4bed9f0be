#![cfg(unix)]

use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tokio::net::TcpListener;

use cmdgate::config::Config;
use cmdgate::runtime::{serve_listener, AppState};

/// Start a real server from a YAML config on an ephemeral port.
async fn spawn_server(yaml: &str) -> String {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let cfg = Config::load(file.path()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(AppState::from_config(&cfg));

    tokio::spawn(async move {
        serve_listener(listener, state).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn serves_alias_requests_over_tcp() {
    let base = spawn_server("mode: alias\nbase_dir: /bin\nexecutables:\n  echo: echo\n").await;
    let client = reqwest::Client::new();

    let greeting: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(greeting["message"], "C++ Executable API Server");

    let response = client
        .post(format!("{}/execute/echo", base))
        .json(&json!({ "args": ["hello", "gateway"] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "stdout": "hello gateway\n", "stderr": "", "returncode": 0 }));

    let unknown = client
        .post(format!("{}/execute/capture", base))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn server_survives_failing_requests() {
    let base = spawn_server("mode: both\nexecutables:\n  sh: /bin/sh\n").await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "path": "/definitely/not/here" }),
        json!({ "path": "relative/tool" }),
        json!({ "args": 7 }),
    ] {
        let status = client
            .post(format!("{}/execute", base))
            .json(&body)
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    }

    let ok: Value = client
        .post(format!("{}/execute/sh", base))
        .json(&json!({ "args": ["-c", "exit 0"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ok["returncode"], 0);
}
