//! Axum router construction for the gateway.
//!
//! Assembles all routes (REST + WebSocket) into a single [`Router`]
//! with CORS middleware enabled for cross-origin client access.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the gateway server.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/{user_id}", get(ws::ws_connect))
        // Users and presence
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::register_user),
        )
        .route("/api/users/me/difficulty", put(handlers::set_difficulty))
        .route("/api/cursors", get(handlers::list_cursors))
        .route("/api/cursor", put(handlers::update_cursor))
        // Pets
        .route(
            "/api/pets",
            get(handlers::list_pets).post(handlers::create_pet),
        )
        .route(
            "/api/pets/{id}",
            get(handlers::get_pet).delete(handlers::release_pet),
        )
        .route("/api/pets/{id}/feed", post(handlers::feed_pet))
        .route("/api/pets/{id}/play", post(handlers::play_pet))
        .route("/api/pets/{id}/sleep", post(handlers::sleep_pet))
        .route("/api/pets/{id}/support", post(handlers::support_pet))
        .route("/api/pets/{id}/revive", post(handlers::revive_pet))
        .route("/api/pets/{id}/position", put(handlers::update_pet_position))
        // Persistence
        .route("/api/flush", post(handlers::flush_now))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
