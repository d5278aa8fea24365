//! REST endpoint handlers for the gateway server.
//!
//! Handlers translate HTTP requests into [`Game`](menagerie_core::Game)
//! calls and map the core's contracts onto status codes: authorization
//! failures become 403, empty results become 404 (release excepted —
//! it is idempotent and reports success), and difficulty values are
//! normalized rather than rejected.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/users` | List user records |
//! | `POST` | `/api/users` | Register a user record |
//! | `PUT` | `/api/users/me/difficulty` | Set the caller's difficulty |
//! | `GET` | `/api/cursors` | List last-known cursor positions |
//! | `PUT` | `/api/cursor` | Move the caller's cursor |
//! | `GET` | `/api/pets` | List pets (optionally by owner) |
//! | `POST` | `/api/pets` | Create a pet for the caller |
//! | `GET` | `/api/pets/{id}` | Get a single pet |
//! | `DELETE` | `/api/pets/{id}` | Release a pet (idempotent) |
//! | `POST` | `/api/pets/{id}/feed` | Feed (owner only) |
//! | `POST` | `/api/pets/{id}/play` | Play (owner only) |
//! | `POST` | `/api/pets/{id}/sleep` | Sleep (owner only) |
//! | `POST` | `/api/pets/{id}/support` | Support (non-owner only) |
//! | `POST` | `/api/pets/{id}/revive` | Revive (owner only) |
//! | `PUT` | `/api/pets/{id}/position` | Nudge a pet's position |
//! | `POST` | `/api/flush` | Persist debounced state now |

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use menagerie_types::{CursorPosition, Pet, PetId, User, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::identity::Caller;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/users`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired unique display name.
    pub username: String,
}

/// Body of `POST /api/pets`.
#[derive(Debug, Deserialize)]
pub struct CreatePetRequest {
    /// Display name of the new pet.
    pub name: String,
}

/// Body of the position and cursor update endpoints.
#[derive(Debug, Deserialize)]
pub struct PointRequest {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Body of `PUT /api/users/me/difficulty`.
#[derive(Debug, Deserialize)]
pub struct DifficultyRequest {
    /// Requested difficulty multiplier; normalized into `[0.25, 4.0]`.
    pub difficulty: f64,
}

/// Query parameters of `GET /api/pets`.
#[derive(Debug, Deserialize)]
pub struct PetsQuery {
    /// Restrict the listing to one owner.
    pub owner: Option<Uuid>,
}

/// Response of `DELETE /api/pets/{id}`.
#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    /// Always true: release treats "already gone" as success.
    pub released: bool,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing world status and API links.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let pets = state.game.pets().await;
    let alive = pets.iter().filter(|pet| pet.alive).count();
    let users = state.game.users().await.len();
    let connections = state.hub.connection_count().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Menagerie Gateway</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
        }}
        .metric .value {{ font-size: 1.6rem; color: #7ee787; }}
        .metric .label {{ color: #8b949e; font-size: 0.8rem; }}
        a {{ color: #58a6ff; }}
    </style>
</head>
<body>
    <h1>Menagerie</h1>
    <p class="subtitle">shared pet world gateway</p>
    <div>
        <div class="metric"><div class="value">{alive}</div><div class="label">pets alive</div></div>
        <div class="metric"><div class="value">{total}</div><div class="label">pets total</div></div>
        <div class="metric"><div class="value">{users}</div><div class="label">users</div></div>
        <div class="metric"><div class="value">{connections}</div><div class="label">live connections</div></div>
    </div>
    <p>
        <a href="/api/pets">/api/pets</a> ·
        <a href="/api/users">/api/users</a> ·
        <a href="/api/cursors">/api/cursors</a>
    </p>
</body>
</html>"#,
        total = pets.len(),
    ))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// List every user record (credentials are never part of the record).
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.game.users().await)
}

/// Register a new user record.
///
/// Called by the credential service after it has created the matching
/// credential entry.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>, GatewayError> {
    let username = request.username.trim().to_owned();
    if username.is_empty() {
        return Err(GatewayError::InvalidRequest(String::from(
            "username must not be empty",
        )));
    }
    let user = state.game.register_user(username).await?;
    Ok(Json(user))
}

/// Set the caller's difficulty multiplier.
pub async fn set_difficulty(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<DifficultyRequest>,
) -> Result<Json<User>, GatewayError> {
    state
        .game
        .set_difficulty(caller, request.difficulty)
        .await
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("no user {caller}")))
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

/// List every last-known cursor position.
pub async fn list_cursors(State(state): State<AppState>) -> Json<Vec<CursorPosition>> {
    Json(state.game.cursors().await)
}

/// Move the caller's own cursor.
pub async fn update_cursor(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<PointRequest>,
) -> Result<Json<CursorPosition>, GatewayError> {
    state
        .game
        .update_cursor(caller, request.x, request.y)
        .await
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("no user {caller}")))
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

/// List pets, optionally restricted to one owner.
pub async fn list_pets(
    State(state): State<AppState>,
    Query(query): Query<PetsQuery>,
) -> Json<Vec<Pet>> {
    let pets = match query.owner {
        Some(owner) => state.game.pets_of(UserId::from(owner)).await,
        None => state.game.pets().await,
    };
    Json(pets)
}

/// Get a single pet.
pub async fn get_pet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    state
        .game
        .pet(PetId::from(id))
        .await
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("no pet {id}")))
}

/// Create a pet owned by the caller. Always succeeds once the caller
/// identity is accepted.
pub async fn create_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(request): Json<CreatePetRequest>,
) -> Result<Json<Pet>, GatewayError> {
    let name = request.name.trim().to_owned();
    if name.is_empty() {
        return Err(GatewayError::InvalidRequest(String::from(
            "pet name must not be empty",
        )));
    }
    Ok(Json(state.game.create_pet(caller, name).await))
}

/// Release a pet. Idempotent: releasing an unknown pet is a success.
pub async fn release_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ReleaseResponse>, GatewayError> {
    let released = state.game.release(caller, PetId::from(id)).await?;
    Ok(Json(ReleaseResponse { released }))
}

/// Feed a pet (owner only).
pub async fn feed_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    let pet = state.game.feed(caller, PetId::from(id)).await?;
    require_found(pet, id)
}

/// Play with a pet (owner only).
pub async fn play_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    let pet = state.game.play(caller, PetId::from(id)).await?;
    require_found(pet, id)
}

/// Put a pet to sleep (owner only).
pub async fn sleep_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    let pet = state.game.sleep(caller, PetId::from(id)).await?;
    require_found(pet, id)
}

/// Support someone else's pet (non-owner only).
pub async fn support_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    let pet = state.game.support(caller, PetId::from(id)).await?;
    require_found(pet, id)
}

/// Revive a pet (owner only).
pub async fn revive_pet(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Pet>, GatewayError> {
    let pet = state.game.revive(caller, PetId::from(id)).await?;
    require_found(pet, id)
}

/// Nudge a pet's on-field position.
///
/// Deliberately not owner-gated: the field is shared social space, so
/// any authenticated user may move any pet. The caller is still
/// extracted so unauthenticated requests are rejected.
pub async fn update_pet_position(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<PointRequest>,
) -> Result<Json<Pet>, GatewayError> {
    state
        .game
        .update_position(PetId::from(id), request.x, request.y)
        .await
        .map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("no pet {id}")))
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Persist debounced state immediately.
///
/// Clients call this right before a voluntary disconnect so the last
/// few seconds of debounced changes are not lost.
pub async fn flush_now(State(state): State<AppState>, Caller(_caller): Caller) -> StatusCode {
    state.persist.flush().await;
    StatusCode::NO_CONTENT
}

/// Map the core's empty result onto a 404.
fn require_found(pet: Option<Pet>, id: Uuid) -> Result<Json<Pet>, GatewayError> {
    pet.map(Json)
        .ok_or_else(|| GatewayError::NotFound(format!("no living pet {id}")))
}
