//! Single-slot offline cache for the last successful facility list.
//!
//! The slot holds exactly one snapshot, overwritten whole on every
//! successful non-empty live fetch and read back when live retrieval is
//! unavailable (fetch failure, or before any coordinate exists). There is
//! no TTL: staleness is implicit in when the slot gets consulted.

use std::sync::Arc;

use crate::state::Facility;
use crate::storage::{FACILITIES_SLOT, Storage};

/// Handle to the facility snapshot slot.
#[derive(Clone)]
pub struct FacilityCache {
    storage: Arc<dyn Storage>,
}

impl FacilityCache {
    /// Create a cache over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Atomically overwrite the slot with `facilities`.
    ///
    /// Write failures are logged and swallowed.
    pub fn save(&self, facilities: &[Facility]) {
        match serde_json::to_string(facilities) {
            Ok(json) => {
                if let Err(e) = self.storage.write(FACILITIES_SLOT, &json) {
                    tracing::warn!(error = %e, "failed to persist facility snapshot");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode facility snapshot"),
        }
    }

    /// Read the current snapshot, or an empty list if none exists or the
    /// slot cannot be decoded.
    #[must_use]
    pub fn load(&self) -> Vec<Facility> {
        self.storage
            .read(FACILITIES_SLOT)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Coordinate, FacilityType, OpenStatus, WaitLevel};
    use crate::storage::MemoryStorage;

    fn facility(id: &str) -> Facility {
        Facility {
            id: id.to_string(),
            name: format!("{id} clinic"),
            kind: FacilityType::Phc,
            location: Coordinate { lat: 12.9, lng: 77.6 },
            status: OpenStatus::Open,
            opens_at: None,
            wait: WaitLevel::Low,
            wait_label: WaitLevel::Low.label().to_string(),
            specialties: vec!["General Care".to_string()],
            phone: "+91 00000 00000".to_string(),
            distance_km: Some(1.2),
            travel_time_mins: Some(8),
            directions_url: None,
            call_url: None,
        }
    }

    #[test]
    fn empty_cache_loads_as_empty_list() {
        let cache = FacilityCache::new(Arc::new(MemoryStorage::new()));
        assert!(cache.load().is_empty());
    }

    #[test]
    fn save_replaces_the_whole_snapshot() {
        let cache = FacilityCache::new(Arc::new(MemoryStorage::new()));
        cache.save(&[facility("a"), facility("b")]);
        assert_eq!(cache.load().len(), 2);
        cache.save(&[facility("c")]);
        let after = cache.load();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, "c");
    }
}
