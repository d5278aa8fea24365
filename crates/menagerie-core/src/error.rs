//! Error types for the mutation API.

use menagerie_types::{PetId, UserId};

/// Authorization failures raised by the mutation API.
///
/// These are surfaced to the routing layer as rejected operations and
/// never retried automatically. "Not found" is deliberately not an
/// error: those paths return an empty result instead (release treats
/// not-found as already-successful).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The caller does not own the target pet, and the operation is
    /// owner-only.
    #[error("user {caller} does not own pet {pet}")]
    NotOwner {
        /// The rejected caller.
        caller: UserId,
        /// The targeted pet.
        pet: PetId,
    },

    /// The caller owns the target pet, and the operation requires a
    /// non-owner (supporting your own pet is not allowed).
    #[error("owners cannot support their own pet {pet}")]
    OwnSupport {
        /// The targeted pet.
        pet: PetId,
    },
}
