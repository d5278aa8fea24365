//! Pet records, positions, and the status derivation.
//!
//! A [`Pet`] is the unit of simulation: four bounded vital stats, a
//! position inside the world rectangle, and a status label that is a
//! pure function of the stats. Stats are clamped to `0..=100` at
//! construction and at every mutation site; the status is recomputed
//! after every change so it can never disagree with the stats that
//! produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PetId, UserId};

/// Upper bound of every vital stat.
pub const STAT_MAX: u8 = 100;

/// Baseline value all four stats are reset to on revival.
pub const REVIVE_BASELINE: u8 = 20;

/// Clamp a raw stat value into the valid `0..=100` range.
pub const fn clamp_stat(value: u8) -> u8 {
    if value > STAT_MAX { STAT_MAX } else { value }
}

/// The rectangular world all pets live in.
///
/// Coordinates are valid in `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// World width in field units.
    pub width: f64,
    /// World height in field units.
    pub height: f64,
}

impl WorldBounds {
    /// Create bounds for a `width x height` world.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp an x coordinate into the world rectangle.
    pub fn clamp_x(&self, x: f64) -> f64 {
        x.clamp(0.0, self.width)
    }

    /// Clamp a y coordinate into the world rectangle.
    pub fn clamp_y(&self, y: f64) -> f64 {
        y.clamp(0.0, self.height)
    }

    /// Whether a point lies inside the world rectangle (bounds inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height
    }
}

/// A pet's location and motion state on the shared field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate in `[0, width]`.
    pub x: f64,
    /// Vertical coordinate in `[0, height]`.
    pub y: f64,
    /// Heading angle in radians.
    pub heading: f64,
    /// Scalar speed in field units per movement tick.
    pub speed: f64,
}

impl Position {
    /// Default movement speed for a newly created pet.
    pub const DEFAULT_SPEED: f64 = 1.0;

    /// Create a position, clamping the coordinates into `bounds`.
    pub fn new(x: f64, y: f64, heading: f64, bounds: &WorldBounds) -> Self {
        Self {
            x: bounds.clamp_x(x),
            y: bounds.clamp_y(y),
            heading,
            speed: Self::DEFAULT_SPEED,
        }
    }

    /// Move the coordinates to `(x, y)`, clamped into `bounds`.
    ///
    /// Heading and speed are preserved: a nudge relocates the pet, it
    /// does not steer it.
    pub fn relocate(&mut self, x: f64, y: f64, bounds: &WorldBounds) {
        self.x = bounds.clamp_x(x);
        self.y = bounds.clamp_y(y);
    }

    /// Advance one movement tick: step `speed` along `heading` and
    /// bounce off the world edges.
    ///
    /// Crossing the x-bounds reflects the heading as `pi - heading`;
    /// crossing the y-bounds reflects it as `-heading`. In both cases
    /// the coordinate is clamped back onto the edge. Landing exactly on
    /// an edge is in-bounds and does not reflect.
    pub fn advance(&mut self, bounds: &WorldBounds) {
        self.x = self.heading.cos().mul_add(self.speed, self.x);
        self.y = self.heading.sin().mul_add(self.speed, self.y);

        if self.x < 0.0 || self.x > bounds.width {
            self.heading = core::f64::consts::PI - self.heading;
            self.x = bounds.clamp_x(self.x);
        }
        if self.y < 0.0 || self.y > bounds.height {
            self.heading = -self.heading;
            self.y = bounds.clamp_y(self.y);
        }
    }
}

/// Derived status label of a pet.
///
/// Always exactly the value dictated by [`PetStatus::derive`] for the
/// pet's current stats and liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PetStatus {
    /// No stat is in distress.
    Happy,
    /// Happiness has fallen below 30.
    Sad,
    /// Energy has fallen below 20.
    Tired,
    /// Hunger has climbed above 80.
    Starving,
    /// Health reached 0; the pet is frozen until revived.
    Dead,
}

impl PetStatus {
    /// Derive the status from stats and liveness.
    ///
    /// Evaluated in fixed priority order: dead (health 0 or liveness
    /// already false), then starving (hunger > 80), then tired
    /// (energy < 20), then sad (happiness < 30), else happy.
    pub const fn derive(health: u8, hunger: u8, energy: u8, happiness: u8, alive: bool) -> Self {
        if !alive || health == 0 {
            Self::Dead
        } else if hunger > 80 {
            Self::Starving
        } else if energy < 20 {
            Self::Tired
        } else if happiness < 30 {
            Self::Sad
        } else {
            Self::Happy
        }
    }
}

impl core::fmt::Display for PetStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Happy => "Happy",
            Self::Sad => "Sad",
            Self::Tired => "Tired",
            Self::Starving => "Starving",
            Self::Dead => "Dead",
        };
        write!(f, "{label}")
    }
}

/// A virtual pet owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    /// Unique identifier.
    pub id: PetId,
    /// Display name chosen by the owner.
    pub name: String,
    /// The owning user. Ownership never changes except by removal.
    pub owner_id: UserId,
    /// Contentment stat, `0..=100`.
    pub happiness: u8,
    /// Hunger stat, `0..=100`. Lower is better.
    pub hunger: u8,
    /// Energy stat, `0..=100`.
    pub energy: u8,
    /// Health stat, `0..=100`. Reaching 0 kills the pet.
    pub health: u8,
    /// Whole seconds since creation, recomputed by the decay sweep.
    pub age: u64,
    /// When the pet was last fed (decay baseline for hunger).
    pub last_fed: DateTime<Utc>,
    /// When the pet was last played with (decay baseline for happiness).
    pub last_played: DateTime<Utc>,
    /// When the pet last slept (decay baseline for energy).
    pub last_slept: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Liveness flag. Dead pets are frozen until revived.
    pub alive: bool,
    /// Derived status label.
    pub status: PetStatus,
    /// Location and motion state on the field.
    pub position: Position,
    /// Cosmetic marker chosen at creation.
    pub marker: String,
}

impl Pet {
    /// Create a newborn pet: full happiness/energy/health, zero hunger,
    /// all action baselines set to `now`.
    pub fn spawn(
        id: PetId,
        name: String,
        owner_id: UserId,
        now: DateTime<Utc>,
        position: Position,
        marker: String,
    ) -> Self {
        Self {
            id,
            name,
            owner_id,
            happiness: STAT_MAX,
            hunger: 0,
            energy: STAT_MAX,
            health: STAT_MAX,
            age: 0,
            last_fed: now,
            last_played: now,
            last_slept: now,
            created_at: now,
            alive: true,
            status: PetStatus::Happy,
            position,
            marker,
        }
    }

    /// Recompute the derived status from the current stats.
    ///
    /// Health at 0 forces liveness false. Returns `true` when this call
    /// is the one that killed the pet (alive -> dead transition), so
    /// callers can escalate the persistence path.
    pub fn refresh_status(&mut self) -> bool {
        let was_alive = self.alive;
        if self.health == 0 {
            self.alive = false;
        }
        self.status = PetStatus::derive(
            self.health,
            self.hunger,
            self.energy,
            self.happiness,
            self.alive,
        );
        was_alive && !self.alive
    }

    /// Reset the pet to the revival baseline: all stats at
    /// [`REVIVE_BASELINE`], alive, happy, action baselines at `now`.
    pub fn revive(&mut self, now: DateTime<Utc>) {
        self.happiness = REVIVE_BASELINE;
        self.hunger = REVIVE_BASELINE;
        self.energy = REVIVE_BASELINE;
        self.health = REVIVE_BASELINE;
        self.alive = true;
        self.status = PetStatus::Happy;
        self.last_fed = now;
        self.last_played = now;
        self.last_slept = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use core::f64::consts::PI;

    use super::*;

    const BOUNDS: WorldBounds = WorldBounds::new(800.0, 600.0);

    fn make_pet() -> Pet {
        Pet::spawn(
            PetId::new(),
            String::from("Rex"),
            UserId::new(),
            Utc::now(),
            Position::new(100.0, 100.0, 0.0, &BOUNDS),
            String::from("🐱"),
        )
    }

    #[test]
    fn spawn_starts_happy_and_full() {
        let pet = make_pet();
        assert_eq!(pet.happiness, 100);
        assert_eq!(pet.hunger, 0);
        assert_eq!(pet.energy, 100);
        assert_eq!(pet.health, 100);
        assert_eq!(pet.age, 0);
        assert!(pet.alive);
        assert_eq!(pet.status, PetStatus::Happy);
    }

    #[test]
    fn clamp_stat_caps_at_100() {
        assert_eq!(clamp_stat(250), 100);
        assert_eq!(clamp_stat(100), 100);
        assert_eq!(clamp_stat(37), 37);
    }

    #[test]
    fn status_priority_order() {
        // Dead wins over everything.
        assert_eq!(PetStatus::derive(0, 100, 0, 0, true), PetStatus::Dead);
        // Liveness false forces Dead even with healthy stats.
        assert_eq!(PetStatus::derive(50, 0, 50, 50, false), PetStatus::Dead);
        // Starving beats tired and sad.
        assert_eq!(PetStatus::derive(50, 81, 0, 0, true), PetStatus::Starving);
        // Tired beats sad.
        assert_eq!(PetStatus::derive(50, 0, 19, 0, true), PetStatus::Tired);
        assert_eq!(PetStatus::derive(50, 0, 50, 29, true), PetStatus::Sad);
        assert_eq!(PetStatus::derive(50, 0, 50, 30, true), PetStatus::Happy);
        // Threshold edges: 80 hunger and 20 energy are still fine.
        assert_eq!(PetStatus::derive(50, 80, 20, 30, true), PetStatus::Happy);
    }

    #[test]
    fn refresh_status_reports_death_once() {
        let mut pet = make_pet();
        pet.health = 0;
        assert!(pet.refresh_status());
        assert!(!pet.alive);
        assert_eq!(pet.status, PetStatus::Dead);
        // Second refresh: still dead, but not a new death.
        assert!(!pet.refresh_status());
    }

    #[test]
    fn revive_resets_to_baseline() {
        let mut pet = make_pet();
        pet.health = 0;
        let _ = pet.refresh_status();

        pet.revive(Utc::now());
        assert_eq!(pet.happiness, 20);
        assert_eq!(pet.hunger, 20);
        assert_eq!(pet.energy, 20);
        assert_eq!(pet.health, 20);
        assert!(pet.alive);
        assert_eq!(pet.status, PetStatus::Happy);
    }

    #[test]
    fn relocate_clamps_and_keeps_heading() {
        let mut pos = Position::new(10.0, 10.0, 1.25, &BOUNDS);
        pos.relocate(-50.0, 9999.0, &BOUNDS);
        assert!((pos.x - 0.0).abs() < f64::EPSILON);
        assert!((pos.y - 600.0).abs() < f64::EPSILON);
        assert!((pos.heading - 1.25).abs() < f64::EPSILON);
        assert!((pos.speed - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn advance_moves_along_heading() {
        let mut pos = Position::new(100.0, 100.0, 0.0, &BOUNDS);
        pos.advance(&BOUNDS);
        assert!((pos.x - 101.0).abs() < 1e-9);
        assert!((pos.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn advance_reflects_off_x_bound() {
        // Heading 0 (due east) one unit from the east wall: the step
        // lands exactly on the wall, which is in-bounds -- no bounce.
        let mut pos = Position::new(799.0, 100.0, 0.0, &BOUNDS);
        pos.advance(&BOUNDS);
        assert!((pos.x - 800.0).abs() < 1e-9);
        assert!((pos.heading - 0.0).abs() < 1e-9);

        // The next step exceeds the wall: reflect and clamp.
        pos.advance(&BOUNDS);
        assert!((pos.x - 800.0).abs() < 1e-9);
        assert!((pos.heading - PI).abs() < 1e-9);

        // Now headed back west.
        pos.advance(&BOUNDS);
        assert!((pos.x - 799.0).abs() < 1e-9);
    }

    #[test]
    fn advance_reflects_off_y_bound() {
        let mut pos = Position::new(100.0, 0.5, -PI / 2.0, &BOUNDS);
        pos.advance(&BOUNDS);
        // Crossed the north wall: clamped to 0, heading negated.
        assert!((pos.y - 0.0).abs() < 1e-9);
        assert!((pos.heading - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_contains_edges() {
        assert!(BOUNDS.contains(0.0, 0.0));
        assert!(BOUNDS.contains(800.0, 600.0));
        assert!(!BOUNDS.contains(800.1, 0.0));
        assert!(!BOUNDS.contains(0.0, -0.1));
    }

    #[test]
    fn pet_serde_roundtrip() {
        let pet = make_pet();
        let json = serde_json::to_string(&pet).unwrap();
        let back: Pet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pet);
    }
}
