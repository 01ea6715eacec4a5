//! Calibration profile persistence.
//!
//! A profile is a named, durable [`CalibrationMap`] plus bookkeeping. The
//! [`ProfileStore`] contract is deliberately small so the engine never
//! depends on a concrete backend: [`SqliteProfileStore`] for deployments,
//! [`MemoryProfileStore`] for tests and ephemeral sessions.

mod memory;
mod sqlite;

pub use memory::MemoryProfileStore;
pub use sqlite::SqliteProfileStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::map::CalibrationMap;

/// Identifying row of a stored profile. The map payload is intentionally
/// absent; listings stay cheap regardless of profile size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Store-assigned stable identifier.
    pub id: i64,
    /// Human-chosen profile name, unique within a store.
    pub name: String,
    /// Time of the last save that touched this profile.
    pub updated_at: DateTime<Utc>,
}

/// Persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    /// The map payload could not be encoded or decoded.
    #[error("profile payload error: {0}")]
    Payload(#[from] serde_json::Error),
    /// A stored timestamp is not valid RFC 3339.
    #[error("invalid timestamp in store: {0}")]
    Timestamp(#[from] chrono::ParseError),
    /// Filesystem preparation for the database failed.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for calibration profiles.
///
/// Contract shared by all backends:
/// - [`save`](Self::save) creates a profile when the name is new and
///   overwrites the map when it exists; either way it returns the
///   profile's id. Ids are stable across updates and never reused.
/// - [`load`](Self::load) returns the stored map, or an empty map for an
///   unknown id.
/// - [`delete`](Self::delete) is a no-op for an unknown id.
pub trait ProfileStore: Send + Sync {
    /// Create or update the profile called `name` with `map`.
    fn save(&self, name: &str, map: &CalibrationMap) -> StoreResult<i64>;

    /// Fetch the map stored under `id`.
    fn load(&self, id: i64) -> StoreResult<CalibrationMap>;

    /// Enumerate stored profiles, oldest id first.
    fn list(&self) -> StoreResult<Vec<ProfileRecord>>;

    /// Remove the profile stored under `id`, if any.
    fn delete(&self, id: i64) -> StoreResult<()>;
}
