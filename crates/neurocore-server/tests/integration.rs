use axum::http::StatusCode;
use http_body_util::BodyExt;
use neurocore_core::command::SystemCommandRunner;
use neurocore_core::config::Config;
use neurocore_core::metrics::{shared, FixedMetrics};
use neurocore_core::prefs::MemoryStore;
use neurocore_server::{build_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mock-mode state with in-memory preferences and a fixed metrics source.
fn state_with_delay(dir: &TempDir, mock_delay_ms: u64) -> AppState {
    let mut config = Config::default();
    config.execution.mock_delay_ms = mock_delay_ms;
    AppState::with_parts(
        dir.path().to_path_buf(),
        config,
        Arc::new(SystemCommandRunner),
        shared(Box::new(FixedMetrics::idle())),
        Arc::new(MemoryStore::new()),
    )
    .unwrap()
}

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&b).unwrap()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

// ---------------------------------------------------------------------------
// Actions and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_actions_returns_catalog() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with_delay(&dir, 0));
    let (status, json) = get(app, "/api/actions").await;

    assert_eq!(status, StatusCode::OK);
    let actions = json.as_array().unwrap();
    assert_eq!(actions.len(), neurocore_core::builtin::ACTIONS.len());
    assert_eq!(actions[0]["id"], "restore-point");
}

#[tokio::test]
async fn list_actions_filters_by_category() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with_delay(&dir, 0));
    let (status, json) = get(app, "/api/actions?category=qos").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["qos-create", "qos-revert", "qos-list"]);
}

#[tokio::test]
async fn unknown_action_is_404() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 0);

    let (status, json) = get(build_router(state.clone()), "/api/actions/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = send(
        build_router(state),
        "POST",
        "/api/actions/does-not-exist/run",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_completes_in_background() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 0);

    let (status, json) = send(
        build_router(state.clone()),
        "POST",
        "/api/actions/temp-cleanup/run",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "running");

    let mut last = serde_json::Value::Null;
    for _ in 0..50 {
        let (_, json) = get(build_router(state.clone()), "/api/status/temp-cleanup").await;
        if json["status"] == "completed" {
            last = json;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(last["status"], "completed");
    assert!(last["last_result"]["message"]
        .as_str()
        .unwrap()
        .contains("cleaned"));
}

#[tokio::test]
async fn second_run_while_running_is_409() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 60_000);

    let (first, _) = send(build_router(state.clone()), "POST", "/api/actions/debloat/run", None).await;
    assert_eq!(first, StatusCode::ACCEPTED);

    let (second, json) = send(build_router(state.clone()), "POST", "/api/actions/debloat/run", None).await;
    assert_eq!(second, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already running"));

    let (_, json) = get(build_router(state), "/api/status/debloat").await;
    assert_eq!(json["status"], "running");
}

#[tokio::test]
async fn events_stream_reports_status_changes() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 0);

    let req = axum::http::Request::builder()
        .uri("/api/events")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    let mut body = response.into_body();

    let (status, _) = send(
        build_router(state.clone()),
        "POST",
        "/api/actions/temp-cleanup/run",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut text = String::new();
    let read = tokio::time::timeout(Duration::from_secs(5), async {
        while !(text.contains("\"status\":\"running\"") && text.contains("\"status\":\"completed\"")) {
            let Some(frame) = body.frame().await else { break };
            if let Ok(data) = frame.unwrap().into_data() {
                text.push_str(&String::from_utf8_lossy(&data));
            }
        }
    })
    .await;
    assert!(read.is_ok(), "no status events within 5s: {text}");
    assert!(text.contains("event: status"));
    assert!(text.contains("\"id\":\"temp-cleanup\""));
    let running = text.find("\"status\":\"running\"").unwrap();
    let completed = text.find("\"status\":\"completed\"").unwrap();
    assert!(running < completed);
}

#[tokio::test]
async fn statuses_start_pending() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with_delay(&dir, 0));
    let (status, json) = get(app, "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["status"] == "pending"));
}

// ---------------------------------------------------------------------------
// Metrics, preferences, settings, config
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_returns_snapshot() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with_delay(&dir, 0));
    let (status, json) = get(app, "/api/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cpu"]["usage"], 25.0);
    assert_eq!(json["cpu"]["cores"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn preference_lifecycle() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 0);

    let (status, _) = get(build_router(state.clone()), "/api/preferences/language").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        build_router(state.clone()),
        "PUT",
        "/api/preferences/language",
        Some(serde_json::json!({ "value": "pt-BR" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = get(build_router(state.clone()), "/api/preferences/language").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], "pt-BR");

    let (_, json) = send(build_router(state.clone()), "DELETE", "/api/preferences/language", None).await;
    assert_eq!(json["deleted"], true);
    let (_, json) = send(build_router(state), "DELETE", "/api/preferences/language", None).await;
    assert_eq!(json["deleted"], false);
}

#[tokio::test]
async fn settings_update_is_partial() {
    let dir = TempDir::new().unwrap();
    let state = state_with_delay(&dir, 0);

    let (_, json) = get(build_router(state.clone()), "/api/settings").await;
    assert_eq!(json["theme"], "dark");
    assert_eq!(json["sidebar_open"], true);

    let (status, json) = send(
        build_router(state.clone()),
        "PUT",
        "/api/settings",
        Some(serde_json::json!({ "theme": "neon" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["theme"], "neon");
    assert_eq!(json["sidebar_open"], true);

    let (status, _) = send(
        build_router(state),
        "PUT",
        "/api/settings",
        Some(serde_json::json!({ "theme": "solarized" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn config_endpoint_reports_mode() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with_delay(&dir, 0));
    let (status, json) = get(app, "/api/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["config"]["execution"]["mode"], "mock");
    assert_eq!(json["config"]["execution"]["mock_delay_ms"], 0);
}
