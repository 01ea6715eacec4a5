//! In-memory profile store for tests and ephemeral sessions.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::map::CalibrationMap;

use super::{ProfileRecord, ProfileStore, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    profiles: BTreeMap<i64, (ProfileRecord, CalibrationMap)>,
}

/// Profile store that keeps everything in process memory.
///
/// Honors the full [`ProfileStore`] contract, including id stability and
/// non-reuse, so tests exercise the same semantics the sqlite backend
/// provides. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    inner: Mutex<Inner>,
}

impl MemoryProfileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn save(&self, name: &str, map: &CalibrationMap) -> StoreResult<i64> {
        let mut inner = self.inner.lock().expect("profile store lock poisoned");
        let existing = inner
            .profiles
            .values()
            .find(|(record, _)| record.name == name)
            .map(|(record, _)| record.id);

        let id = match existing {
            Some(id) => id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        let record = ProfileRecord {
            id,
            name: name.to_owned(),
            updated_at: Utc::now(),
        };
        inner.profiles.insert(id, (record, map.clone()));
        Ok(id)
    }

    fn load(&self, id: i64) -> StoreResult<CalibrationMap> {
        let inner = self.inner.lock().expect("profile store lock poisoned");
        Ok(inner
            .profiles
            .get(&id)
            .map(|(_, map)| map.clone())
            .unwrap_or_default())
    }

    fn list(&self) -> StoreResult<Vec<ProfileRecord>> {
        let inner = self.inner.lock().expect("profile store lock poisoned");
        Ok(inner
            .profiles
            .values()
            .map(|(record, _)| record.clone())
            .collect())
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("profile store lock poisoned");
        inner.profiles.remove(&id);
        Ok(())
    }
}
