//! Persistence of the user's chosen facility.
//!
//! The selection survives restarts and may legitimately reference a
//! facility that is absent from the current list; consumers treat the
//! embedded snapshot as the source of truth for stale ids.

use std::sync::Arc;

use crate::state::{Facility, Selection};
use crate::storage::{SELECTION_SLOT, Storage};

/// Handle to the durable selection slot.
#[derive(Clone)]
pub struct SelectionStore {
    storage: Arc<dyn Storage>,
}

impl SelectionStore {
    /// Create a store over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist `facility` as the active selection and return the new
    /// [`Selection`] value.
    pub fn select(&self, facility: &Facility) -> Selection {
        let selection = Selection {
            facility_id: facility.id.clone(),
            facility: facility.clone(),
        };
        match serde_json::to_string(&selection) {
            Ok(json) => {
                if let Err(e) = self.storage.write(SELECTION_SLOT, &json) {
                    tracing::warn!(error = %e, "failed to persist selection");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode selection"),
        }
        selection
    }

    /// Load the persisted selection, if one exists and decodes.
    #[must_use]
    pub fn load(&self) -> Option<Selection> {
        self.storage
            .read(SELECTION_SLOT)
            .and_then(|raw| serde_json::from_str(&raw).ok())
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
            name: format!("{id} hospital"),
            kind: FacilityType::Dh,
            location: Coordinate { lat: 12.9, lng: 77.6 },
            status: OpenStatus::Open,
            opens_at: None,
            wait: WaitLevel::Medium,
            wait_label: WaitLevel::Medium.label().to_string(),
            specialties: vec!["General Care".to_string()],
            phone: "+91 00000 00000".to_string(),
            distance_km: Some(2.5),
            travel_time_mins: None,
            directions_url: None,
            call_url: None,
        }
    }

    #[test]
    fn selection_survives_a_new_store_over_the_same_backend() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = SelectionStore::new(Arc::clone(&storage));
        assert!(store.load().is_none());
        store.select(&facility("f1"));

        let reopened = SelectionStore::new(storage);
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.facility_id, "f1");
        assert_eq!(loaded.facility.name, "f1 hospital");
    }

    #[test]
    fn select_overwrites_previous_choice() {
        let store = SelectionStore::new(Arc::new(MemoryStorage::new()));
        store.select(&facility("f1"));
        store.select(&facility("f2"));
        assert_eq!(store.load().unwrap().facility_id, "f2");
    }
}
