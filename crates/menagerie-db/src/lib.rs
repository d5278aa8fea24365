//! Data layer for the Menagerie pet world.
//!
//! Two durable stores with different shapes:
//!
//! - [`SnapshotStore`] -- the non-sensitive world snapshot (pets and
//!   cursors) as one JSON document, written as a complete replace.
//! - [`UserStore`] -- user records in SQLite, keyed by identifier.
//!   Credentials live in the external credential service, not here.

pub mod error;
pub mod snapshot;
pub mod users;

pub use error::DbError;
pub use snapshot::SnapshotStore;
pub use users::UserStore;
