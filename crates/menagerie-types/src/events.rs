//! Typed broadcast events pushed to every live subscriber.
//!
//! Events are serialized as JSON objects discriminated by a snake_case
//! `type` field, e.g. `{"type":"stats_update","pets":[...]}`. The same
//! [`Event`] values flow to in-process listeners and, serialized once,
//! to every WebSocket connection.

use serde::{Deserialize, Serialize};

use crate::ids::PetId;
use crate::pet::{Pet, PetStatus};
use crate::user::CursorPosition;

/// Per-pet vital stats as carried by a `stats_update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetVitals {
    /// The pet the stats belong to.
    pub id: PetId,
    /// Contentment stat.
    pub happiness: u8,
    /// Hunger stat.
    pub hunger: u8,
    /// Energy stat.
    pub energy: u8,
    /// Health stat.
    pub health: u8,
    /// Whole seconds since creation.
    pub age: u64,
    /// Derived status label.
    pub status: PetStatus,
    /// Liveness flag.
    pub alive: bool,
}

impl From<&Pet> for PetVitals {
    fn from(pet: &Pet) -> Self {
        Self {
            id: pet.id,
            happiness: pet.happiness,
            hunger: pet.hunger,
            energy: pet.energy,
            health: pet.health,
            age: pet.age,
            status: pet.status,
            alive: pet.alive,
        }
    }
}

/// Per-pet location as carried by a `position_update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetTrack {
    /// The pet that moved.
    pub id: PetId,
    /// New horizontal coordinate.
    pub x: f64,
    /// New vertical coordinate.
    pub y: f64,
    /// New heading angle in radians.
    pub heading: f64,
}

impl From<&Pet> for PetTrack {
    fn from(pet: &Pet) -> Self {
        Self {
            id: pet.id,
            x: pet.position.x,
            y: pet.position.y,
            heading: pet.position.heading,
        }
    }
}

/// A broadcast event delivered to all live subscribers.
///
/// Single-entity stat and position changes ship as a batch of one; the
/// simulation sweeps ship one aggregated batch per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One or more pets' vital stats changed.
    StatsUpdate {
        /// The changed pets' vitals.
        pets: Vec<PetVitals>,
    },
    /// One or more pets moved.
    PositionUpdate {
        /// The moved pets' new locations.
        positions: Vec<PetTrack>,
    },
    /// A pet was created. Carries the full record.
    PetCreated {
        /// The newborn pet.
        pet: Pet,
    },
    /// A pet was released (removed permanently).
    PetRemoved {
        /// The removed pet's identifier.
        id: PetId,
    },
    /// A user's cursor moved on the shared field.
    CursorUpdate {
        /// The new cursor position.
        cursor: CursorPosition,
    },
}

impl Event {
    /// A `stats_update` for a single pet.
    pub fn stats_for(pet: &Pet) -> Self {
        Self::StatsUpdate {
            pets: vec![PetVitals::from(pet)],
        }
    }

    /// A `position_update` for a single pet.
    pub fn position_for(pet: &Pet) -> Self {
        Self::PositionUpdate {
            positions: vec![PetTrack::from(pet)],
        }
    }
}

/// A message a client sends inbound over its WebSocket connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The client's cursor moved.
    CursorUpdate {
        /// Horizontal coordinate.
        x: f64,
        /// Vertical coordinate.
        y: f64,
    },
    /// Persist now: the client is about to disconnect and does not want
    /// to lose the last few seconds of debounced state.
    Flush,
}
