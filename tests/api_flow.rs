use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use pulseshrine::api::{self, AppState};
use pulseshrine::clock::{SystemClock, UuidGen};
use pulseshrine::repository::{self, PulseRepository, AI_USAGE_TRACKING_DAYS};
use pulseshrine::store::memory::MemoryStore;
use pulseshrine::store::Store;

fn app() -> axum::Router {
    let mut layout = repository::table_layout();
    layout.push((AI_USAGE_TRACKING_DAYS, vec![]));
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new(layout));
    let state = Arc::new(AppState {
        repo: Arc::new(PulseRepository::new(store)),
        clock: Arc::new(SystemClock),
        idgen: Arc::new(UuidGen),
    });
    api::router(state)
}

fn json_request(method: &str, uri: &str, user: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-user-id", user)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn start_then_get_then_stop_round_trips_a_pulse() {
    let app = app();

    let start_body = serde_json::json!({
        "intent": "write the quarterly plan",
        "duration_seconds": 1800,
    });
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/start-pulse", "alice", start_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/start-pulse")
                .header("x-user-id", "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stop_body = serde_json::json!({
        "reflection": "made good progress on the outline",
    });
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/stop-pulse", "alice", stop_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn starting_twice_for_the_same_user_conflicts() {
    let app = app();
    let start_body = serde_json::json!({"intent": "read", "duration_seconds": 600});

    let first = app
        .clone()
        .oneshot(json_request("POST", "/start-pulse", "bob", start_body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(json_request("POST", "/start-pulse", "bob", start_body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_user_header_is_rejected() {
    let app = app();
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/start-pulse")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stopping_without_starting_is_a_bad_request() {
    let app = app();
    let stop_body = serde_json::json!({"reflection": "nothing was running"});
    let resp = app
        .oneshot(json_request("POST", "/stop-pulse", "ghost", stop_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
