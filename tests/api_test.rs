//! HTTP API tests driven through the router without a listener

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use vote_ledger::api::{router, AppState};

mod common;
use common::*;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn token(state: &AppState, user: &str) -> String {
    state.identity.issue_token(user).unwrap()
}

#[tokio::test]
async fn test_health_and_status() {
    let (_db, state, _) = setup_state().await;
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["election_id"], ELECTION);
    assert_eq!(body["ledger"]["status"], "initialized");
    assert_eq!(body["ledger"]["height"], 1);
}

#[tokio::test]
async fn test_vote_requires_session() {
    let (_db, state, candidates) = setup_state().await;
    let app = router(state.clone());

    let body = json!({ "candidateId": candidates[0] });
    let (status, response) = send(&app, Method::POST, "/vote", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["error"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::POST, "/vote", Some("not-a-token"), Some(body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(state.ledger().height().await.unwrap(), 1);
}

#[tokio::test]
async fn test_vote_flow() {
    let (_db, state, candidates) = setup_state().await;
    let app = router(state.clone());
    let alice = token(&state, "alice");

    let (status, body) = send(&app, Method::GET, "/vote/status", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasVoted"], false);

    let request = json!({ "candidateId": candidates[2], "candidateName": "Alan Turing" });
    let (status, body) = send(&app, Method::POST, "/vote", Some(&alice), Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blockIndex"], 1);
    let tail = state.ledger().latest().await.unwrap();
    assert_eq!(body["blockHash"], tail.hash);

    let (status, body) = send(&app, Method::GET, "/vote/status", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "alice");
    assert_eq!(body["hasVoted"], true);
    assert_eq!(body["candidateId"], candidates[2]);

    let (status, body) = send(&app, Method::POST, "/vote", Some(&alice), Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_VOTED");
}

#[tokio::test]
async fn test_vote_rejections() {
    let (db, state, _) = setup_state().await;
    let app = router(state.clone());
    db.set_role("root", "admin").await.unwrap();
    let root = token(&state, "root");
    let bob = token(&state, "bob");

    let (status, _) = send(&app, Method::POST, "/vote", Some(&root), Some(json!({ "candidateId": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::POST, "/vote", Some(&bob), Some(json!({ "candidateId": 4242 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/vote", Some(&bob), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.ledger().height().await.unwrap(), 1);
}

#[tokio::test]
async fn test_audit_endpoint() {
    let (db, state, candidates) = setup_state().await;
    let app = router(state.clone());

    for (user, candidate) in [("alice", candidates[0]), ("bob", candidates[1])] {
        let session = token(&state, user);
        let (status, _) = send(&app, Method::POST, "/vote", Some(&session), Some(json!({ "candidateId": candidate }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, "/audit", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SECURE");
    assert_eq!(body["total_blocks_verified"], 3);

    tamper_block(&db, 2, "hash", &"0".repeat(64)).await;

    let (status, body) = send(&app, Method::GET, "/audit", None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "COMPROMISED");
    let kinds: Vec<&str> = body["report"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"DATA_TAMPERING"));
}

#[tokio::test]
async fn test_audit_empty_ledger() {
    let db = setup_test_db().await;
    let app = router(AppState::new(test_config(), db));

    let (status, body) = send(&app, Method::GET, "/audit", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "EMPTY");
}

#[tokio::test]
async fn test_candidate_endpoints() {
    let (db, state, candidates) = setup_state().await;
    let app = router(state.clone());
    db.set_role("root", "admin").await.unwrap();
    let root = token(&state, "root");
    let alice = token(&state, "alice");

    let (status, body) = send(&app, Method::GET, "/candidates", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let new = json!({ "name": "Edsger Dijkstra", "description": "Considered harmful" });
    let (status, _) = send(&app, Method::POST, "/candidates", Some(&alice), Some(new.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, Method::POST, "/candidates", Some(&root), Some(new)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Edsger Dijkstra");
    assert_eq!(created["vote_count"], 0);

    let (status, _) = send(&app, Method::POST, "/vote", Some(&alice), Some(json!({ "candidateId": candidates[0] }))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/candidates/{}", candidates[0]);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CANDIDATE_HAS_VOTES");

    let uri = format!("/candidates/{}", created["id"]);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], created["id"]);

    let (_, body) = send(&app, Method::GET, "/candidates", None, None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_vote_body_checked_after_session() {
    let (_db, state, _) = setup_state().await;
    let app = router(state.clone());
    let alice = token(&state, "alice");

    let malformed = |token: Option<&str>| {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/vote")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from("{ not json")).unwrap()
    };

    let response = app.clone().oneshot(malformed(None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(malformed(Some(&alice))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "INVALID_REQUEST");

    assert_eq!(state.ledger().height().await.unwrap(), 1);
}
