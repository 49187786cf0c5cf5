//! HTTP API tests
//!
//! Drives the queue router directly with `tower::ServiceExt::oneshot`,
//! asserting on the status codes and the `{status, message, data}` envelope
//! that clients depend on. Gateways are mocked, the queue store is real.

mod fixtures;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fixtures::{token_for, MockIdentityClient, TestSystem};
use pairup::http::server::{create_router, ApiState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router_for(system: &TestSystem) -> axum::Router {
    create_router(ApiState {
        engine: system.engine.clone(),
        identity: Arc::new(MockIdentityClient),
        store: system.store.clone(),
        metrics: system.metrics.clone(),
        service_name: "pairup-test".to_string(),
    })
}

fn join_request(user_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/queue/join")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn status_request(user_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/queue")
        .header(
            header::COOKIE,
            format!("access-token={}", token_for(user_id)),
        )
        .body(Body::empty())
        .unwrap()
}

async fn read_envelope(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn easy_array_prefs() -> Value {
    json!({
        "complexity": "Easy",
        "categories": ["Array"],
        "language": "python3",
    })
}

#[tokio::test]
async fn test_join_queues_first_user() {
    let system = fixtures::create_test_system();
    let app = router_for(&system);

    let response = app
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_envelope(response).await;
    assert_eq!(body["message"], "Joined Queue!");
    assert_eq!(body["data"]["complexity"], "Easy");
    assert_eq!(body["data"]["language"], "python3");
    assert!(body["data"]["expireAt"].is_string());
}

#[tokio::test]
async fn test_join_creates_room_for_second_user() {
    let system = fixtures::create_test_system();

    let response = router_for(&system)
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router_for(&system)
        .oneshot(join_request("bob", easy_array_prefs()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_envelope(response).await;
    assert_eq!(body["message"], "Room Created");
    assert_eq!(body["data"]["question-id"], "q-Easy-Array");
}

#[tokio::test]
async fn test_duplicate_join_conflicts() {
    let system = fixtures::create_test_system();

    router_for(&system)
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();
    let response = router_for(&system)
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_envelope(response).await;
    assert_eq!(body["status"], 409);
    assert_eq!(body["message"], "In Queue!");
}

#[tokio::test]
async fn test_status_transitions_over_the_wire() {
    let system = fixtures::create_test_system();

    // Unknown user: 404 with the advertised preference choices.
    let response = router_for(&system)
        .oneshot(status_request("alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_envelope(response).await;
    assert_eq!(body["message"], "Not in room or queue");
    assert!(body["data"]["categories"].as_array().is_some_and(|c| !c.is_empty()));

    // Queued after a join miss: 200.
    router_for(&system)
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();
    let response = router_for(&system)
        .oneshot(status_request("alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Roomed after a partner arrives: 303.
    router_for(&system)
        .oneshot(join_request("bob", easy_array_prefs()))
        .await
        .unwrap();
    let response = router_for(&system)
        .oneshot(status_request("alice"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = read_envelope(response).await;
    assert_eq!(body["message"], "In room!");
}

#[tokio::test]
async fn test_join_reads_preferences_from_query_string() {
    let system = fixtures::create_test_system();

    let request = Request::builder()
        .method("POST")
        .uri("/queue/join?complexity=Hard&categories[]=Stack&categories[]=Graph&language=rust")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token_for("alice")),
        )
        .body(Body::empty())
        .unwrap();

    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_envelope(response).await;
    assert_eq!(body["data"]["complexity"], "Hard");
    assert_eq!(body["data"]["language"], "rust");
    assert_eq!(body["data"]["categories"], json!(["Stack", "Graph"]));
}

#[tokio::test]
async fn test_leave_always_acknowledges() {
    let system = fixtures::create_test_system();

    let request = Request::builder()
        .method("DELETE")
        .uri("/queue")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token_for("alice")),
        )
        .body(Body::empty())
        .unwrap();

    // Not queued at all; still a 200 acknowledgement.
    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_envelope(response).await;
    assert_eq!(body["message"], "Received command to remove user from queue");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let system = fixtures::create_test_system();

    let request = Request::builder()
        .method("GET")
        .uri("/queue")
        .body(Body::empty())
        .unwrap();

    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_envelope(response).await;
    assert_eq!(body["message"], "No access-token");
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let system = fixtures::create_test_system();

    let request = Request::builder()
        .method("GET")
        .uri("/queue")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::empty())
        .unwrap();

    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoint_reports_queue_depth() {
    let system = fixtures::create_test_system();

    router_for(&system)
        .oneshot(join_request("alice", easy_array_prefs()))
        .await
        .unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_envelope(response).await;
    assert_eq!(body["stats"]["users_waiting"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_text() {
    let system = fixtures::create_test_system();

    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = router_for(&system).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("pairup_queue_depth"));
}
