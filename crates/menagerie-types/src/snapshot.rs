//! The persisted snapshot document.
//!
//! The snapshot is a complete-replace JSON document holding the pet
//! collection and the cursor collection, keyed by identifier. User
//! records and credentials are persisted separately (SQLite and the
//! external credential store respectively) and never appear here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{PetId, UserId};
use crate::pet::Pet;
use crate::user::CursorPosition;

/// The non-sensitive world state written to durable storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// All pets, keyed by identifier.
    #[serde(default)]
    pub pets: BTreeMap<PetId, Pet>,
    /// All last-known cursor positions, keyed by owning user.
    #[serde(default)]
    pub cursors: BTreeMap<UserId, CursorPosition>,
}

impl SnapshotDocument {
    /// Whether at least one live pet exists in the document.
    ///
    /// The backup persistence loop only writes when this holds.
    pub fn has_live_pets(&self) -> bool {
        self.pets.values().any(|pet| pet.alive)
    }
}
