//! The mutation API: synchronous operations invoked by external
//! callers on behalf of an already-authenticated user.
//!
//! [`Game`] is the single entry point the routing layer talks to. It is
//! constructed with explicit dependencies (store, persistence
//! controller, user store, event channel) — no ambient global state.
//! Every operation validates ownership, mutates the store under its
//! write lock, re-derives the status, decides a persistence path, and
//! enqueues a broadcast event. The store guard is always released
//! before persistence or broadcast work, so a slow disk or subscriber
//! never extends the critical section.
//!
//! Contract summary:
//! - ownership violations are typed [`ActionError`]s,
//! - "not found" returns an empty result rather than an error,
//! - `release` treats not-found as already-successful (idempotent),
//! - `update_position` deliberately has no ownership check: the field
//!   position is shared social space and any user may nudge any pet.

use std::sync::Arc;

use chrono::Utc;
use menagerie_types::{
    clamp_stat, normalize_difficulty, CursorPosition, Event, Pet, PetId, Position, User, UserId,
};
use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::WorldConfig;
use crate::error::ActionError;
use crate::persist::PersistenceController;
use crate::sim;
use crate::store::EntityStore;
use menagerie_db::{DbError, UserStore};

/// Hunger relief applied by one feeding.
pub const FEED_HUNGER_RELIEF: u8 = 15;

/// Health bonus applied by feeding a pet that is not starving afterwards.
pub const FEED_HEALTH_BONUS: u8 = 2;

/// Happiness gained from one play session.
pub const PLAY_HAPPINESS_GAIN: u8 = 12;

/// Energy spent by one play session.
pub const PLAY_ENERGY_COST: u8 = 5;

/// Energy restored by one sleep.
pub const SLEEP_ENERGY_GAIN: u8 = 15;

/// Happiness lost when sleep pushes energy past the overslept mark.
pub const SLEEP_OVERSLEPT_PENALTY: u8 = 2;

/// Marker used when the configured marker set is empty.
const FALLBACK_MARKER: &str = "🐾";

/// Which stat a `support` action will improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupportTarget {
    Happiness,
    Energy,
    Health,
    Hunger,
}

/// The mutation API over the shared pet world.
///
/// Cheap to share: clone the [`Arc`] it is usually wrapped in.
pub struct Game {
    store: Arc<RwLock<EntityStore>>,
    persist: Arc<PersistenceController>,
    users_db: UserStore,
    events: UnboundedSender<Event>,
    world: WorldConfig,
}

impl Game {
    /// Wire up the mutation API from its collaborators.
    pub const fn new(
        store: Arc<RwLock<EntityStore>>,
        persist: Arc<PersistenceController>,
        users_db: UserStore,
        events: UnboundedSender<Event>,
        world: WorldConfig,
    ) -> Self {
        Self {
            store,
            persist,
            users_db,
            events,
            world,
        }
    }

    // -----------------------------------------------------------------
    // Reads (served to the routing layer)
    // -----------------------------------------------------------------

    /// All pets, in id order.
    pub async fn pets(&self) -> Vec<Pet> {
        self.store.read().await.pets().cloned().collect()
    }

    /// A single pet by id.
    pub async fn pet(&self, id: PetId) -> Option<Pet> {
        self.store.read().await.pet(id).cloned()
    }

    /// All pets owned by one user.
    pub async fn pets_of(&self, owner: UserId) -> Vec<Pet> {
        self.store
            .read()
            .await
            .pets()
            .filter(|pet| pet.owner_id == owner)
            .cloned()
            .collect()
    }

    /// A single user record by id.
    pub async fn user(&self, id: UserId) -> Option<User> {
        self.store.read().await.user(id).cloned()
    }

    /// All user records.
    pub async fn users(&self) -> Vec<User> {
        self.store.read().await.users().cloned().collect()
    }

    /// All last-known cursor positions.
    pub async fn cursors(&self) -> Vec<CursorPosition> {
        self.store.read().await.cursors().cloned().collect()
    }

    // -----------------------------------------------------------------
    // User records
    // -----------------------------------------------------------------

    /// Register a new user record.
    ///
    /// The external credential service calls this once it has created
    /// the matching credential entry; the engine only keeps the
    /// non-sensitive record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UsernameTaken`] if the username is already
    /// registered, or another [`DbError`] if the durable insert fails.
    pub async fn register_user(&self, username: String) -> Result<User, DbError> {
        let user = User::new(UserId::new(), username, Utc::now());
        self.users_db.insert(&user).await?;
        self.store.write().await.insert_user(user.clone());
        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Set a user's online flag, mirroring it to the durable store.
    ///
    /// Returns the updated record, or `None` for an unknown user.
    pub async fn set_online(&self, user_id: UserId, online: bool) -> Option<User> {
        let user = {
            let mut store = self.store.write().await;
            let user = store.user_mut(user_id)?;
            user.online = online;
            user.clone()
        };
        // Best-effort mirror: a failed row update only delays the flag.
        if let Err(err) = self.users_db.set_online(user_id, online).await {
            warn!(user_id = %user_id, error = %err, "Online flag update failed");
        }
        Some(user)
    }

    /// Set a user's difficulty multiplier.
    ///
    /// The value is normalized into `[0.25, 4.0]` (non-finite input
    /// becomes 1.0) before it is applied, mirrored to the durable
    /// store, and picked up by the next debounced snapshot.
    pub async fn set_difficulty(&self, user_id: UserId, value: f64) -> Option<User> {
        let difficulty = normalize_difficulty(value);
        let user = {
            let mut store = self.store.write().await;
            let user = store.user_mut(user_id)?;
            user.difficulty = difficulty;
            user.clone()
        };
        if let Err(err) = self.users_db.set_difficulty(user_id, difficulty).await {
            warn!(user_id = %user_id, error = %err, "Difficulty update failed");
        }
        self.persist.schedule_save();
        Some(user)
    }

    /// Update the caller's own cursor position and broadcast it.
    ///
    /// Cursor movement is low priority: persistence is debounced only.
    /// Returns `None` for an unknown user.
    pub async fn update_cursor(&self, user_id: UserId, x: f64, y: f64) -> Option<CursorPosition> {
        let cursor = {
            let mut store = self.store.write().await;
            let username = store.user(user_id)?.username.clone();
            let cursor = CursorPosition {
                user_id,
                username,
                x,
                y,
                timestamp: Utc::now(),
            };
            store.set_cursor(cursor.clone());
            cursor
        };
        self.persist.schedule_save();
        self.emit(Event::CursorUpdate {
            cursor: cursor.clone(),
        });
        Some(cursor)
    }

    // -----------------------------------------------------------------
    // Pet lifecycle
    // -----------------------------------------------------------------

    /// Create a pet for `owner`: randomized spawn position inside the
    /// world inset, randomized heading, randomized cosmetic marker.
    ///
    /// Creation is a major event: the snapshot is flushed immediately
    /// and a `pet_created` event carries the full record to every
    /// subscriber.
    pub async fn create_pet(&self, owner: UserId, name: String) -> Pet {
        let bounds = self.world.bounds();
        let (position, marker) = {
            let mut rng = rand::rng();
            let x = spawn_coord(&mut rng, bounds.width, self.world.spawn_inset);
            let y = spawn_coord(&mut rng, bounds.height, self.world.spawn_inset);
            let heading = rng.random_range(0.0..core::f64::consts::TAU);
            (Position::new(x, y, heading, &bounds), self.pick_marker(&mut rng))
        };

        let pet = Pet::spawn(PetId::new(), name, owner, Utc::now(), position, marker);
        self.store.write().await.insert_pet(pet.clone());

        info!(pet_id = %pet.id, owner_id = %owner, name = %pet.name, "Pet created");
        self.persist.mark_dirty();
        self.persist.flush().await;
        self.emit(Event::PetCreated { pet: pet.clone() });
        pet
    }

    /// Release (permanently remove) a pet.
    ///
    /// Idempotent: releasing an already-removed pet is a success.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotOwner`] if the pet exists and the
    /// caller does not own it.
    pub async fn release(&self, caller: UserId, pet_id: PetId) -> Result<bool, ActionError> {
        {
            let mut store = self.store.write().await;
            match store.pet(pet_id).map(|pet| pet.owner_id) {
                None => return Ok(true),
                Some(owner) if owner != caller => {
                    return Err(ActionError::NotOwner {
                        caller,
                        pet: pet_id,
                    });
                }
                Some(_) => {
                    let _ = store.remove_pet(pet_id);
                }
            }
        }

        info!(pet_id = %pet_id, owner_id = %caller, "Pet released");
        self.persist.mark_dirty();
        self.persist.flush().await;
        self.emit(Event::PetRemoved { id: pet_id });
        Ok(true)
    }

    /// Revive a pet, ignoring current liveness: all stats reset to the
    /// fixed baseline, action baselines refreshed, status happy.
    ///
    /// Revival is a major event and flushes immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotOwner`] if the caller does not own the
    /// pet.
    pub async fn revive(&self, caller: UserId, pet_id: PetId) -> Result<Option<Pet>, ActionError> {
        let pet = {
            let mut store = self.store.write().await;
            let Some(pet) = store.pet_mut(pet_id) else {
                return Ok(None);
            };
            if pet.owner_id != caller {
                return Err(ActionError::NotOwner {
                    caller,
                    pet: pet_id,
                });
            }
            pet.revive(Utc::now());
            pet.clone()
        };

        info!(pet_id = %pet_id, "Pet revived");
        self.persist.mark_dirty();
        self.persist.flush().await;
        self.emit(Event::stats_for(&pet));
        Ok(Some(pet))
    }

    // -----------------------------------------------------------------
    // Owner care actions
    // -----------------------------------------------------------------

    /// Feed a pet: hunger down, a little health back when not starving
    /// afterwards, feeding baseline refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotOwner`] if the caller does not own the
    /// pet.
    pub async fn feed(&self, caller: UserId, pet_id: PetId) -> Result<Option<Pet>, ActionError> {
        self.care_action(caller, pet_id, |pet| {
            pet.hunger = pet.hunger.saturating_sub(FEED_HUNGER_RELIEF);
            if pet.hunger < 80 {
                pet.health = clamp_stat(pet.health.saturating_add(FEED_HEALTH_BONUS));
            }
            pet.last_fed = Utc::now();
        })
        .await
    }

    /// Play with a pet: happiness up at a small energy cost, play
    /// baseline refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotOwner`] if the caller does not own the
    /// pet.
    pub async fn play(&self, caller: UserId, pet_id: PetId) -> Result<Option<Pet>, ActionError> {
        self.care_action(caller, pet_id, |pet| {
            pet.happiness = clamp_stat(pet.happiness.saturating_add(PLAY_HAPPINESS_GAIN));
            pet.energy = pet.energy.saturating_sub(PLAY_ENERGY_COST);
            pet.last_played = Utc::now();
        })
        .await
    }

    /// Put a pet to sleep: energy up, a small happiness penalty when it
    /// oversleeps, sleep baseline refreshed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotOwner`] if the caller does not own the
    /// pet.
    pub async fn sleep(&self, caller: UserId, pet_id: PetId) -> Result<Option<Pet>, ActionError> {
        self.care_action(caller, pet_id, |pet| {
            pet.energy = clamp_stat(pet.energy.saturating_add(SLEEP_ENERGY_GAIN));
            if pet.energy > 90 {
                pet.happiness = pet.happiness.saturating_sub(SLEEP_OVERSLEPT_PENALTY);
            }
            pet.last_slept = Utc::now();
        })
        .await
    }

    /// Support someone else's pet: improve exactly its single worst-off
    /// stat by one unit.
    ///
    /// The worst-off stat is the numeric minimum of happiness, energy,
    /// health, and hunger (hunger counts its raw value — lower hunger
    /// is the healthier state), with ties broken in that declaration
    /// order. Hunger "improves" downward; the rest improve upward.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::OwnSupport`] if the caller owns the pet:
    /// support is a non-owner social mechanic.
    pub async fn support(&self, caller: UserId, pet_id: PetId) -> Result<Option<Pet>, ActionError> {
        let (pet, died) = {
            let mut store = self.store.write().await;
            let Some(pet) = store.pet_mut(pet_id) else {
                return Ok(None);
            };
            if pet.owner_id == caller {
                return Err(ActionError::OwnSupport { pet: pet_id });
            }
            if !pet.alive {
                return Ok(None);
            }

            match worst_stat(pet) {
                SupportTarget::Happiness => {
                    pet.happiness = clamp_stat(pet.happiness.saturating_add(1));
                }
                SupportTarget::Energy => {
                    pet.energy = clamp_stat(pet.energy.saturating_add(1));
                }
                SupportTarget::Health => {
                    pet.health = clamp_stat(pet.health.saturating_add(1));
                }
                SupportTarget::Hunger => {
                    pet.hunger = pet.hunger.saturating_sub(1);
                }
            }

            let died = pet.refresh_status();
            (pet.clone(), died)
        };

        debug!(pet_id = %pet_id, supporter = %caller, "Pet supported");
        self.after_stat_change(&pet, died).await;
        Ok(Some(pet))
    }

    // -----------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------

    /// Nudge a pet's on-field position.
    ///
    /// Deliberately ownership-free: the field is shared social space
    /// and any authenticated user may move any pet ("poke the pet").
    /// Coordinates are clamped into the world rectangle; heading and
    /// speed are preserved. Returns `None` for an unknown pet.
    pub async fn update_position(&self, pet_id: PetId, x: f64, y: f64) -> Option<Pet> {
        let bounds = self.world.bounds();
        let pet = {
            let mut store = self.store.write().await;
            let pet = store.pet_mut(pet_id)?;
            pet.position.relocate(x, y, &bounds);
            pet.clone()
        };
        self.persist.schedule_save();
        self.emit(Event::position_for(&pet));
        Some(pet)
    }

    // -----------------------------------------------------------------
    // Simulation ticks (driven by the scheduler loops)
    // -----------------------------------------------------------------

    /// Run one stat-decay sweep and fan out its effects.
    ///
    /// A sweep with deaths flushes the snapshot immediately; an
    /// ordinary sweep schedules a debounced save. An empty sweep (no
    /// live pets) broadcasts nothing.
    pub async fn decay_tick(&self, now: chrono::DateTime<Utc>) {
        let outcome = {
            let mut store = self.store.write().await;
            sim::decay_sweep(&mut store, now)
        };

        if outcome.changed.is_empty() {
            return;
        }

        if outcome.deaths > 0 {
            info!(deaths = outcome.deaths, "Pets died this tick");
            self.persist.mark_dirty();
            self.persist.flush().await;
        } else {
            self.persist.schedule_save();
        }

        self.emit(Event::StatsUpdate {
            pets: outcome.changed,
        });
    }

    /// Run one movement sweep and broadcast the aggregated tracks.
    ///
    /// Movement never triggers persistence directly; positions ride
    /// along with the next decay-loop or action-triggered save.
    pub async fn movement_tick(&self, rng: &mut (impl Rng + Send)) {
        let bounds = self.world.bounds();
        let tracks = {
            let mut store = self.store.write().await;
            sim::movement_sweep(&mut store, &bounds, rng)
        };

        if tracks.is_empty() {
            return;
        }

        self.emit(Event::PositionUpdate { positions: tracks });
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Shared shape of the owner-only care actions: guard, apply the
    /// deltas, re-derive status, persist, broadcast.
    async fn care_action(
        &self,
        caller: UserId,
        pet_id: PetId,
        apply: impl FnOnce(&mut Pet),
    ) -> Result<Option<Pet>, ActionError> {
        let (pet, died) = {
            let mut store = self.store.write().await;
            let Some(pet) = store.pet_mut(pet_id) else {
                return Ok(None);
            };
            if pet.owner_id != caller {
                return Err(ActionError::NotOwner {
                    caller,
                    pet: pet_id,
                });
            }
            if !pet.alive {
                return Ok(None);
            }

            apply(pet);
            let died = pet.refresh_status();
            (pet.clone(), died)
        };

        self.after_stat_change(&pet, died).await;
        Ok(Some(pet))
    }

    /// Persistence and broadcast tail shared by every stat mutation:
    /// debounce unless the change caused a death, then announce the
    /// single-entity stats update.
    async fn after_stat_change(&self, pet: &Pet, died: bool) {
        if died {
            self.persist.mark_dirty();
            self.persist.flush().await;
        } else {
            self.persist.schedule_save();
        }
        self.emit(Event::stats_for(pet));
    }

    /// Enqueue an event for the broadcast hub.
    ///
    /// Delivery failures never reach mutation callers; a closed channel
    /// just means no hub is listening (e.g. in tests).
    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("Event channel closed; broadcast dropped");
        }
    }

    /// Choose a cosmetic marker for a newborn pet.
    fn pick_marker(&self, rng: &mut impl Rng) -> String {
        if self.world.markers.is_empty() {
            return String::from(FALLBACK_MARKER);
        }
        let idx = rng.random_range(0..self.world.markers.len());
        self.world
            .markers
            .get(idx)
            .cloned()
            .unwrap_or_else(|| String::from(FALLBACK_MARKER))
    }
}

impl core::fmt::Debug for Game {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Game")
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}

/// The single worst-off stat of a pet, ties broken in declaration
/// order: happiness, energy, health, hunger.
fn worst_stat(pet: &Pet) -> SupportTarget {
    let mut target = SupportTarget::Happiness;
    let mut worst = pet.happiness;
    for (candidate, value) in [
        (SupportTarget::Energy, pet.energy),
        (SupportTarget::Health, pet.health),
        (SupportTarget::Hunger, pet.hunger),
    ] {
        if value < worst {
            target = candidate;
            worst = value;
        }
    }
    target
}

/// A spawn coordinate inside the world inset, falling back to the
/// center when the world is too small to carry the inset.
fn spawn_coord(rng: &mut impl Rng, extent: f64, inset: f64) -> f64 {
    let lo = inset.max(0.0);
    let hi = extent - inset;
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        extent / 2.0
    }
}
