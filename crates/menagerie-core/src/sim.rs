//! The simulation scheduler: stat decay (1 Hz) and movement (10 Hz).
//!
//! Both sweeps iterate once per tick over all live pets, read-modify-
//! write the entity store under its write lock, and hand an aggregated
//! event back to the caller. Dead pets are frozen: neither sweep
//! touches them until revival.
//!
//! The owner's difficulty multiplier `d` (clamped to `[0.25, 4.0]`)
//! scales the decay thresholds inversely, so higher difficulty decays
//! faster. Whenever a threshold fires, the corresponding last-action
//! baseline is reset to now — a pet left unwatched does not burst
//! through hours of catch-up decay when the next tick finally sees it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use menagerie_types::{clamp_stat, PetTrack, PetVitals, UserId, WorldBounds};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::actions::Game;
use crate::store::EntityStore;

/// Seconds without feeding (at difficulty 1.0) before hunger rises.
pub const HUNGER_THRESHOLD_SECS: f64 = 30.0;

/// Seconds without play (at difficulty 1.0) before happiness falls.
pub const HAPPINESS_THRESHOLD_SECS: f64 = 60.0;

/// Seconds without sleep (at difficulty 1.0) before energy falls.
pub const ENERGY_THRESHOLD_SECS: f64 = 45.0;

/// Probability per movement tick that a pet wanders onto a new heading.
pub const WANDER_PROBABILITY: f64 = 0.02;

/// Result of one stat-decay sweep.
#[derive(Debug, Clone, Default)]
pub struct DecayOutcome {
    /// Vitals of every pet that changed this tick.
    pub changed: Vec<PetVitals>,
    /// Number of pets that died this tick.
    pub deaths: u32,
}

/// Elapsed seconds between two instants, never negative.
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = to.signed_duration_since(from).num_milliseconds();
    if millis <= 0 {
        0.0
    } else {
        millis as f64 / 1000.0
    }
}

/// One stat-decay tick over every live pet.
///
/// Applies hunger/happiness/energy decay against the owner-scaled
/// thresholds, derives health damage from distressed stats, recomputes
/// status (killing the pet when health reaches 0), and refreshes age.
pub fn decay_sweep(store: &mut EntityStore, now: DateTime<Utc>) -> DecayOutcome {
    // Difficulty lookups are resolved up front so the mutable pet walk
    // below does not alias the user map.
    let owners: BTreeSet<UserId> = store.pets().map(|pet| pet.owner_id).collect();
    let difficulties: BTreeMap<UserId, f64> = owners
        .into_iter()
        .map(|owner| (owner, store.owner_difficulty(owner)))
        .collect();

    let mut outcome = DecayOutcome::default();

    for pet in store.pets_mut() {
        if !pet.alive {
            continue;
        }

        let difficulty = difficulties
            .get(&pet.owner_id)
            .copied()
            .unwrap_or(menagerie_types::DIFFICULTY_DEFAULT);

        if elapsed_secs(pet.last_fed, now) > HUNGER_THRESHOLD_SECS / difficulty {
            pet.hunger = clamp_stat(pet.hunger.saturating_add(1));
            pet.last_fed = now;
        }
        if elapsed_secs(pet.last_played, now) > HAPPINESS_THRESHOLD_SECS / difficulty {
            pet.happiness = pet.happiness.saturating_sub(1);
            pet.last_played = now;
        }
        if elapsed_secs(pet.last_slept, now) > ENERGY_THRESHOLD_SECS / difficulty {
            pet.energy = pet.energy.saturating_sub(1);
            pet.last_slept = now;
        }

        // Distress in any supporting stat erodes health.
        if pet.hunger > 80 || pet.happiness < 20 || pet.energy < 20 {
            pet.health = pet.health.saturating_sub(1);
        }

        if pet.refresh_status() {
            outcome.deaths = outcome.deaths.saturating_add(1);
        }

        let age_secs = now.signed_duration_since(pet.created_at).num_seconds();
        pet.age = u64::try_from(age_secs).unwrap_or(0);

        outcome.changed.push(PetVitals::from(&*pet));
    }

    outcome
}

/// One movement tick over every live pet.
///
/// Advances each pet along its heading, bounces off the world edges,
/// and occasionally perturbs the heading by a uniform value in
/// `[-0.5, 0.5]` radians. Returns the new track of every live pet.
pub fn movement_sweep(
    store: &mut EntityStore,
    bounds: &WorldBounds,
    rng: &mut impl Rng,
) -> Vec<PetTrack> {
    let mut tracks = Vec::new();

    for pet in store.pets_mut() {
        if !pet.alive {
            continue;
        }

        pet.position.advance(bounds);

        if rng.random_bool(WANDER_PROBABILITY) {
            pet.position.heading += rng.random_range(-0.5..=0.5);
        }

        tracks.push(PetTrack::from(&*pet));
    }

    tracks
}

/// Run the stat-decay loop forever, one sweep per `period`.
pub async fn run_decay_loop(game: Arc<Game>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        game.decay_tick(Utc::now()).await;
    }
}

/// Run the movement loop forever, one sweep per `period`.
pub async fn run_movement_loop(game: Arc<Game>, period: Duration) {
    let mut rng = SmallRng::from_os_rng();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        game.movement_tick(&mut rng).await;
    }
}
