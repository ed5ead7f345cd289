//! Durable single-slot storage behind an injected trait.
//!
//! Every persisted piece of state in carefinder is one named slot holding
//! one JSON document, overwritten whole on save (last-write-wins, no TTL,
//! no partial merge). Domain code receives a [`Storage`] handle instead of
//! touching ambient paths directly, so tests swap in [`MemoryStorage`]
//! while production uses [`DirStorage`].

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::state::UrgencyLevel;

/// Slot name for the cached facility snapshot.
pub const FACILITIES_SLOT: &str = "facilities_snapshot";
/// Slot name for the active selection.
pub const SELECTION_SLOT: &str = "selected_facility";
/// Slot name of the read-only triage result written by the triage engine.
pub const TRIAGE_SLOT: &str = "triage_result";

/// A keyed store of whole-value JSON slots.
///
/// Reads are best-effort: a missing or unreadable slot reads as `None`.
/// Callers treat failed writes as recoverable (log and continue).
pub trait Storage: Send + Sync {
    /// Read the raw JSON document stored under `slot`, if any.
    fn read(&self, slot: &str) -> Option<String>;
    /// Overwrite the document stored under `slot`.
    fn write(&self, slot: &str, value: &str) -> std::io::Result<()>;
}

/// Directory-backed storage: one `<slot>.json` file per slot.
#[derive(Clone, Debug)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    /// Create a store rooted at `root`, ensuring the directory exists.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let _ = fs::create_dir_all(&root);
        Self { root }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.root.join(format!("{slot}.json"))
    }
}

impl Storage for DirStorage {
    fn read(&self, slot: &str) -> Option<String> {
        fs::read_to_string(self.slot_path(slot)).ok()
    }

    fn write(&self, slot: &str, value: &str) -> std::io::Result<()> {
        fs::write(self.slot_path(slot), value)
    }
}

/// In-memory storage for tests and embedders that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, slot: &str) -> Option<String> {
        self.slots
            .lock()
            .ok()
            .and_then(|slots| slots.get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &str) -> std::io::Result<()> {
        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(slot.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Read the triage urgency from the read-only [`TRIAGE_SLOT`].
///
/// The slot is written by the external triage collaborator as
/// `{"urgency_level": "..."}`. Absent or malformed content falls back to
/// routine urgency, matching the original behavior before any triage run.
#[must_use]
pub fn triage_urgency(storage: &dyn Storage) -> UrgencyLevel {
    #[derive(serde::Deserialize)]
    struct TriageResult {
        urgency_level: UrgencyLevel,
    }

    storage
        .read(TRIAGE_SLOT)
        .and_then(|raw| serde_json::from_str::<TriageResult>(&raw).ok())
        .map(|t| t.urgency_level)
        .unwrap_or_default()
}
