//! Integration tests for the gateway API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic, routing, the
//! caller-identity boundary, and the error mapping without needing a
//! live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use menagerie_core::{EntityStore, Game, PersistenceController};
use menagerie_core::config::WorldConfig;
use menagerie_db::{SnapshotStore, UserStore};
use menagerie_gateway::router::build_router;
use menagerie_gateway::{run_hub, AppState, Hub};
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tower::ServiceExt;

struct TestWorld {
    state: AppState,
    _dir: tempfile::TempDir,
}

async fn make_world() -> TestWorld {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RwLock::new(EntityStore::new()));
    let persist = PersistenceController::new(
        Arc::clone(&store),
        SnapshotStore::new(dir.path().join("world.json")),
        Duration::from_millis(50),
    );

    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    let users_db = UserStore::with_pool(pool).await.unwrap();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let game = Arc::new(Game::new(
        store,
        Arc::clone(&persist),
        users_db,
        events_tx,
        WorldConfig::default(),
    ));

    let hub = Arc::new(Hub::new());
    let _ = tokio::spawn(run_hub(Arc::clone(&hub), events_rx));

    TestWorld {
        state: AppState::new(game, hub, persist),
        _dir: dir,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register a user through the API and return its id string.
async fn register(world: &TestWorld, username: &str) -> String {
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(format!(r#"{{"username":"{username}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    json["id"].as_str().unwrap().to_owned()
}

/// Create a pet through the API for the given caller.
async fn create_pet(world: &TestWorld, caller: &str, name: &str) -> Value {
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/pets")
                .header("content-type", "application/json")
                .header("x-user-id", caller)
                .body(Body::from(format!(r#"{{"name":"{name}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_to_json(response.into_body()).await
}

#[tokio::test]
async fn index_returns_html() {
    let world = make_world().await;
    let response = build_router(world.state.clone())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Menagerie"));
}

#[tokio::test]
async fn register_then_list_users() {
    let world = make_world().await;
    let id = register(&world, "ada").await;

    let response = build_router(world.state.clone())
        .oneshot(Request::get("/api/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    let users = json.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"].as_str().unwrap(), id);
    assert_eq!(users[0]["username"], "ada");
    // Credential material never appears in the record.
    assert!(users[0].get("password").is_none());
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let world = make_world().await;
    let _ = register(&world, "ada").await;

    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"username":"ada"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn blank_username_is_rejected() {
    let world = make_world().await;
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/users")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"username":"   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_require_a_caller_identity() {
    let world = make_world().await;
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/pets")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"Rex"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Garbage identities are rejected the same way.
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/pets")
                .header("content-type", "application/json")
                .header("x-user-id", "not-a-uuid")
                .body(Body::from(r#"{"name":"Rex"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_pet_returns_a_newborn() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let pet = create_pet(&world, &owner, "Rex").await;

    assert_eq!(pet["name"], "Rex");
    assert_eq!(pet["owner_id"].as_str().unwrap(), owner);
    assert_eq!(pet["happiness"], 100);
    assert_eq!(pet["hunger"], 0);
    assert_eq!(pet["health"], 100);
    assert_eq!(pet["status"], "Happy");
    assert_eq!(pet["alive"], true);

    let x = pet["position"]["x"].as_f64().unwrap();
    let y = pet["position"]["y"].as_f64().unwrap();
    assert!((0.0..=800.0).contains(&x));
    assert!((0.0..=600.0).contains(&y));
}

#[tokio::test]
async fn owner_actions_apply_and_strangers_get_403() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let stranger = register(&world, "mallory").await;
    let pet = create_pet(&world, &owner, "Rex").await;
    let pet_id = pet["id"].as_str().unwrap();

    let response = build_router(world.state.clone())
        .oneshot(
            Request::post(format!("/api/pets/{pet_id}/play"))
                .header("x-user-id", &owner)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let played = body_to_json(response.into_body()).await;
    assert_eq!(played["energy"], 95);

    let response = build_router(world.state.clone())
        .oneshot(
            Request::post(format!("/api/pets/{pet_id}/feed"))
                .header("x-user-id", &stranger)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let error = body_to_json(response.into_body()).await;
    assert_eq!(error["status"], 403);
}

#[tokio::test]
async fn support_is_non_owner_only() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let helper = register(&world, "grace").await;
    let pet = create_pet(&world, &owner, "Rex").await;
    let pet_id = pet["id"].as_str().unwrap();

    // The owner supporting their own pet is an authorization error.
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post(format!("/api/pets/{pet_id}/support"))
                .header("x-user-id", &owner)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = build_router(world.state.clone())
        .oneshot(
            Request::post(format!("/api/pets/{pet_id}/support"))
                .header("x-user-id", &helper)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_pet_is_404_but_release_is_idempotent() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let ghost = uuid::Uuid::new_v4();

    let response = build_router(world.state.clone())
        .oneshot(
            Request::get(format!("/api/pets/{ghost}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = build_router(world.state.clone())
        .oneshot(
            Request::delete(format!("/api/pets/{ghost}"))
                .header("x-user-id", &owner)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["released"], true);
}

#[tokio::test]
async fn position_nudges_are_open_to_any_caller() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let stranger = register(&world, "grace").await;
    let pet = create_pet(&world, &owner, "Rex").await;
    let pet_id = pet["id"].as_str().unwrap();

    let response = build_router(world.state.clone())
        .oneshot(
            Request::put(format!("/api/pets/{pet_id}/position"))
                .header("content-type", "application/json")
                .header("x-user-id", &stranger)
                .body(Body::from(r#"{"x":-25.0,"y":125.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let moved = body_to_json(response.into_body()).await;
    // Out-of-bounds input is clamped, not rejected.
    assert_eq!(moved["position"]["x"].as_f64().unwrap(), 0.0);
    assert_eq!(moved["position"]["y"].as_f64().unwrap(), 125.0);
}

#[tokio::test]
async fn difficulty_is_normalized_not_rejected() {
    let world = make_world().await;
    let user = register(&world, "ada").await;

    let response = build_router(world.state.clone())
        .oneshot(
            Request::put("/api/users/me/difficulty")
                .header("content-type", "application/json")
                .header("x-user-id", &user)
                .body(Body::from(r#"{"difficulty":100.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["difficulty"].as_f64().unwrap(), 4.0);
}

#[tokio::test]
async fn cursor_updates_roundtrip_through_the_listing() {
    let world = make_world().await;
    let user = register(&world, "ada").await;

    let response = build_router(world.state.clone())
        .oneshot(
            Request::put("/api/cursor")
                .header("content-type", "application/json")
                .header("x-user-id", &user)
                .body(Body::from(r#"{"x":12.5,"y":42.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = build_router(world.state.clone())
        .oneshot(Request::get("/api/cursors").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let cursors = json.as_array().unwrap();
    assert_eq!(cursors.len(), 1);
    assert_eq!(cursors[0]["username"], "ada");
    assert_eq!(cursors[0]["x"].as_f64().unwrap(), 12.5);
}

#[tokio::test]
async fn flush_endpoint_persists_pending_state() {
    let world = make_world().await;
    let owner = register(&world, "ada").await;
    let pet = create_pet(&world, &owner, "Rex").await;
    let pet_id = pet["id"].as_str().unwrap();

    // A debounced change sits in memory...
    let response = build_router(world.state.clone())
        .oneshot(
            Request::put(format!("/api/pets/{pet_id}/position"))
                .header("content-type", "application/json")
                .header("x-user-id", &owner)
                .body(Body::from(r#"{"x":300.0,"y":200.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // ...until the client asks for an immediate flush.
    let response = build_router(world.state.clone())
        .oneshot(
            Request::post("/api/flush")
                .header("x-user-id", &owner)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!world.state.persist.is_dirty());
}

#[tokio::test]
async fn pets_listing_filters_by_owner() {
    let world = make_world().await;
    let ada = register(&world, "ada").await;
    let grace = register(&world, "grace").await;
    let _ = create_pet(&world, &ada, "Rex").await;
    let _ = create_pet(&world, &ada, "Mochi").await;
    let _ = create_pet(&world, &grace, "Pixel").await;

    let response = build_router(world.state.clone())
        .oneshot(Request::get("/api/pets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let all = body_to_json(response.into_body()).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let response = build_router(world.state.clone())
        .oneshot(
            Request::get(format!("/api/pets?owner={ada}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let owned = body_to_json(response.into_body()).await;
    assert_eq!(owned.as_array().unwrap().len(), 2);
}
