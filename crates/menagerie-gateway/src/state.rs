//! Shared application state for the gateway server.
//!
//! [`AppState`] holds `Arc`ed handles to the core services every
//! handler needs: the mutation API, the broadcast hub, and the
//! persistence controller (for the explicit flush paths). It is
//! injected via Axum's `State` extractor.

use std::sync::Arc;

use menagerie_core::{Game, PersistenceController};

use crate::hub::Hub;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// The mutation API over the shared world.
    pub game: Arc<Game>,
    /// The broadcast hub connections register with.
    pub hub: Arc<Hub>,
    /// The persistence controller, for client-initiated flushes.
    pub persist: Arc<PersistenceController>,
}

impl AppState {
    /// Bundle the service handles into an application state.
    pub const fn new(
        game: Arc<Game>,
        hub: Arc<Hub>,
        persist: Arc<PersistenceController>,
    ) -> Self {
        Self { game, hub, persist }
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
