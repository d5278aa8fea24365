//! The authoritative in-memory entity store.
//!
//! Holds the canonical user, pet, and cursor records and answers
//! lookups. Nothing here performs I/O or network work: the store is
//! pure in-memory state plus simple derivation helpers. All access
//! goes through one `tokio::sync::RwLock` owned by the caller, so each
//! mutation's read-modify-write is atomic with respect to every other
//! execution context.

use std::collections::BTreeMap;

use menagerie_types::{
    normalize_difficulty, CursorPosition, Pet, PetId, SnapshotDocument, User, UserId,
    DIFFICULTY_DEFAULT,
};

/// Canonical in-memory state of the pet world.
#[derive(Debug, Default)]
pub struct EntityStore {
    users: BTreeMap<UserId, User>,
    pets: BTreeMap<PetId, Pet>,
    cursors: BTreeMap<UserId, CursorPosition>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------

    /// Insert or replace a user record.
    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Look up a user by identifier.
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// Look up a user for mutation.
    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    /// Iterate all user records.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// The owner's difficulty multiplier, defaulting to 1.0 when the
    /// owner record is missing and clamped into the valid range either
    /// way.
    pub fn owner_difficulty(&self, owner_id: UserId) -> f64 {
        self.users
            .get(&owner_id)
            .map_or(DIFFICULTY_DEFAULT, |user| {
                normalize_difficulty(user.difficulty)
            })
    }

    // -----------------------------------------------------------------
    // Pets
    // -----------------------------------------------------------------

    /// Insert or replace a pet record.
    pub fn insert_pet(&mut self, pet: Pet) {
        self.pets.insert(pet.id, pet);
    }

    /// Look up a pet by identifier.
    pub fn pet(&self, id: PetId) -> Option<&Pet> {
        self.pets.get(&id)
    }

    /// Look up a pet for mutation.
    pub fn pet_mut(&mut self, id: PetId) -> Option<&mut Pet> {
        self.pets.get_mut(&id)
    }

    /// Remove a pet permanently. Returns the removed record, if any.
    pub fn remove_pet(&mut self, id: PetId) -> Option<Pet> {
        self.pets.remove(&id)
    }

    /// Iterate all pet records.
    pub fn pets(&self) -> impl Iterator<Item = &Pet> {
        self.pets.values()
    }

    /// Iterate all pet records mutably (simulation sweeps).
    pub fn pets_mut(&mut self) -> impl Iterator<Item = &mut Pet> {
        self.pets.values_mut()
    }

    /// Number of pets in the store.
    pub fn pet_count(&self) -> usize {
        self.pets.len()
    }

    /// Number of live pets in the store.
    pub fn live_pet_count(&self) -> usize {
        self.pets.values().filter(|pet| pet.alive).count()
    }

    // -----------------------------------------------------------------
    // Cursors
    // -----------------------------------------------------------------

    /// Record a user's latest cursor position.
    pub fn set_cursor(&mut self, cursor: CursorPosition) {
        self.cursors.insert(cursor.user_id, cursor);
    }

    /// Iterate all last-known cursor positions.
    pub fn cursors(&self) -> impl Iterator<Item = &CursorPosition> {
        self.cursors.values()
    }

    // -----------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------

    /// Extract the non-sensitive state as a snapshot document.
    pub fn snapshot(&self) -> SnapshotDocument {
        SnapshotDocument {
            pets: self.pets.clone(),
            cursors: self.cursors.clone(),
        }
    }

    /// Replace pets and cursors from a loaded snapshot document.
    ///
    /// User records are hydrated separately from their own store.
    pub fn hydrate(&mut self, document: SnapshotDocument) {
        self.pets = document.pets;
        self.cursors = document.cursors;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use menagerie_types::{Position, WorldBounds};

    use super::*;

    const BOUNDS: WorldBounds = WorldBounds::new(800.0, 600.0);

    fn make_pet(owner: UserId) -> Pet {
        Pet::spawn(
            PetId::new(),
            String::from("Rex"),
            owner,
            Utc::now(),
            Position::new(10.0, 10.0, 0.0, &BOUNDS),
            String::from("🐶"),
        )
    }

    #[test]
    fn owner_difficulty_defaults_on_missing_owner() {
        let store = EntityStore::new();
        assert!((store.owner_difficulty(UserId::new()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn owner_difficulty_is_clamped() {
        let mut store = EntityStore::new();
        let mut user = User::new(UserId::new(), String::from("ada"), Utc::now());
        user.difficulty = 64.0;
        let id = user.id;
        store.insert_user(user);
        assert!((store.owner_difficulty(id) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn live_pet_count_ignores_dead() {
        let mut store = EntityStore::new();
        let owner = UserId::new();
        store.insert_pet(make_pet(owner));

        let mut dead = make_pet(owner);
        dead.health = 0;
        let _ = dead.refresh_status();
        store.insert_pet(dead);

        assert_eq!(store.pet_count(), 2);
        assert_eq!(store.live_pet_count(), 1);
    }

    #[test]
    fn snapshot_hydrate_roundtrip() {
        let mut store = EntityStore::new();
        let owner = UserId::new();
        store.insert_user(User::new(owner, String::from("ada"), Utc::now()));
        let pet = make_pet(owner);
        let pet_id = pet.id;
        store.insert_pet(pet);
        store.set_cursor(CursorPosition {
            user_id: owner,
            username: String::from("ada"),
            x: 5.0,
            y: 6.0,
            timestamp: Utc::now(),
        });

        let snapshot = store.snapshot();
        assert_eq!(snapshot.pets.len(), 1);
        assert_eq!(snapshot.cursors.len(), 1);

        let mut restored = EntityStore::new();
        restored.hydrate(snapshot);
        assert!(restored.pet(pet_id).is_some());
        assert_eq!(restored.cursors().count(), 1);
        // Users are not part of the snapshot document.
        assert_eq!(restored.users().count(), 0);
    }

    #[test]
    fn remove_pet_returns_record() {
        let mut store = EntityStore::new();
        let pet = make_pet(UserId::new());
        let id = pet.id;
        store.insert_pet(pet);

        assert!(store.remove_pet(id).is_some());
        assert!(store.remove_pet(id).is_none());
        assert!(store.pet(id).is_none());
    }
}
