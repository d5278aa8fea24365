//! User records and the shared cursor presence signal.
//!
//! A [`User`] is an owner identity. Credential material never appears
//! here: the external credential service validates bearer tokens and
//! hands the engine an opaque, already-verified [`UserId`](crate::ids::UserId).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Lower bound of the per-user difficulty multiplier.
pub const DIFFICULTY_MIN: f64 = 0.25;

/// Upper bound of the per-user difficulty multiplier.
pub const DIFFICULTY_MAX: f64 = 4.0;

/// Difficulty applied when a user has never set one, or when the input
/// cannot be interpreted as a finite number.
pub const DIFFICULTY_DEFAULT: f64 = 1.0;

/// Normalize a raw difficulty value into `[0.25, 4.0]`.
///
/// Non-finite input (NaN, infinities) is normalized to the default
/// before clamping, so garbage can never leave the valid range.
pub fn normalize_difficulty(raw: f64) -> f64 {
    let value = if raw.is_finite() {
        raw
    } else {
        DIFFICULTY_DEFAULT
    };
    value.clamp(DIFFICULTY_MIN, DIFFICULTY_MAX)
}

/// A registered user of the shared pet world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique display name.
    pub username: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the user currently holds a live connection.
    pub online: bool,
    /// Per-user stat decay multiplier, always in `[0.25, 4.0]`.
    /// Higher values decay pet stats faster.
    pub difficulty: f64,
}

impl User {
    /// Create a new user record with default presence and difficulty.
    pub fn new(id: UserId, username: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            created_at,
            online: false,
            difficulty: DIFFICULTY_DEFAULT,
        }
    }
}

/// A user's last-known cursor position on the shared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// The user the cursor belongs to.
    pub user_id: UserId,
    /// The user's display name, denormalized for client rendering.
    pub username: String,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// When the cursor was last observed.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_clamps_both_ends() {
        assert!((normalize_difficulty(0.0) - 0.25).abs() < f64::EPSILON);
        assert!((normalize_difficulty(-5.0) - 0.25).abs() < f64::EPSILON);
        assert!((normalize_difficulty(100.0) - 4.0).abs() < f64::EPSILON);
        assert!((normalize_difficulty(2.5) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn difficulty_normalizes_non_finite() {
        assert!((normalize_difficulty(f64::NAN) - 1.0).abs() < f64::EPSILON);
        assert!((normalize_difficulty(f64::INFINITY) - 1.0).abs() < f64::EPSILON);
        assert!((normalize_difficulty(f64::NEG_INFINITY) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_user_defaults() {
        let user = User::new(UserId::new(), String::from("ada"), Utc::now());
        assert!(!user.online);
        assert!((user.difficulty - 1.0).abs() < f64::EPSILON);
    }
}
