//! Gateway server (Axum HTTP + WebSocket) and broadcast hub for the
//! Menagerie pet world.
//!
//! # Modules
//!
//! - [`state`] -- shared [`AppState`](state::AppState) injected into
//!   every handler
//! - [`hub`] -- the broadcast [`Hub`](hub::Hub) and its delivery task
//! - [`router`] -- route assembly
//! - [`handlers`] -- REST endpoint handlers
//! - [`ws`] -- the per-user WebSocket endpoint
//! - [`identity`] -- caller identity extraction
//! - [`server`] -- server lifecycle
//! - [`error`] -- HTTP error mapping

pub mod error;
pub mod handlers;
pub mod hub;
pub mod identity;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::GatewayError;
pub use hub::{run_hub, Hub};
pub use server::{start_server, ServerError};
pub use state::AppState;
