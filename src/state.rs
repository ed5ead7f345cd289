//! Core domain and coordination types for carefinder.
//!
//! This module defines the serializable data structures used across the
//! crate: facility descriptors, search coordination types, the repository
//! phase machine, and the central [`AppState`] container mutated by the
//! runtime and logic layers. Facility snapshots and selections are persisted
//! between runs.

use serde::{Deserialize, Serialize};

use crate::error::FindError;

/// Preset radius ladder offered for one-tap expansion, in meters.
pub const RADIUS_LADDER: [u32; 3] = [5_000, 10_000, 20_000];

/// Default value taken by the custom radius before the user edits it.
pub const DEFAULT_CUSTOM_RADIUS_M: u32 = 15_000;

/// Custom radius floor applied when the ladder expands past its last preset.
pub const EXPANDED_CUSTOM_RADIUS_M: u32 = 30_000;

/// Geographic coordinate in floating degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, north positive.
    pub lat: f64,
    /// Longitude in degrees, east positive.
    pub lng: f64,
}

/// Administrative tier of a facility, as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityType {
    /// Primary Health Centre.
    Phc,
    /// Community Health Centre.
    Chc,
    /// Sub-District Hospital.
    Sdh,
    /// District Hospital.
    Dh,
    /// Medical College hospital.
    MedicalCollege,
    /// Private facility.
    Private,
}

impl FacilityType {
    /// Human display label for badges and list rows.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Phc => "PHC",
            Self::Chc => "CHC",
            Self::Sdh => "SDH",
            Self::Dh => "District Hospital",
            Self::MedicalCollege => "Medical College",
            Self::Private => "Private",
        }
    }

    /// Whether this tier handles emergencies (the `emergency` category).
    #[must_use]
    pub fn is_emergency_capable(self) -> bool {
        matches!(self, Self::Dh | Self::MedicalCollege)
    }
}

/// Tri-state operating status derived from the backend's `is_open_now`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStatus {
    /// Confirmed open right now.
    Open,
    /// Confirmed closed; `Facility::opens_at` may say when it reopens.
    Closed,
    /// Operating hours unavailable.
    Unknown,
}

impl OpenStatus {
    /// Status line shown next to the facility name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open now",
            Self::Closed => "Closed",
            Self::Unknown => "Hours unavailable",
        }
    }
}

/// Coarse wait-time indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitLevel {
    /// Short queue.
    Low,
    /// Moderate queue.
    Medium,
    /// Long queue.
    High,
}

impl WaitLevel {
    /// Display label matching the level.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low wait",
            Self::Medium => "Medium wait",
            Self::High => "High wait",
        }
    }

    /// Fallback level for a facility at `index` in the result list when the
    /// backend sends no wait indicator. The rotation is a display
    /// placeholder, not clinical guidance.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        match index % 3 {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// A medical care location with type, coordinates, and operational metadata.
///
/// Instances are ephemeral: recreated from the wire on every fetch, or
/// rehydrated whole from the cache snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Backend identifier, stable across fetches.
    pub id: String,
    /// Facility name for display.
    pub name: String,
    /// Administrative tier.
    pub kind: FacilityType,
    /// Geographic position.
    pub location: Coordinate,
    /// Operating status derived from the backend's tri-state field.
    pub status: OpenStatus,
    /// Reopening time, when known and currently closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opens_at: Option<String>,
    /// Wait indicator, from the response or the rotation fallback.
    pub wait: WaitLevel,
    /// Wait text, from the response or the level's default label.
    pub wait_label: String,
    /// Offered specialties; never empty after normalization.
    pub specialties: Vec<String>,
    /// Contact number; a placeholder when the backend sends none.
    pub phone: String,
    /// Road distance from the search origin, if the backend computed one.
    /// `None` excludes the facility from radius filtering.
    pub distance_km: Option<f64>,
    /// Estimated travel time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time_mins: Option<u32>,
    /// Deep link for turn-by-turn directions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directions_url: Option<String>,
    /// Deep link for a phone call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_url: Option<String>,
}

/// Severity classification from the triage engine, shaping search requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    /// Immediate, life-threatening.
    Emergency,
    /// Needs care soon.
    Urgent,
    /// Routine visit.
    #[default]
    Routine,
    /// Self-care guidance suffices.
    SelfCare,
}

/// Category filter applied on top of the radius cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// No category restriction.
    #[default]
    All,
    /// Emergency-capable tiers only (DH, Medical College).
    Emergency,
    /// Facilities confirmed open right now.
    Open,
}

impl CategoryFilter {
    /// Stable key used in the settings file and on the CLI.
    #[must_use]
    pub fn as_config_key(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Emergency => "emergency",
            Self::Open => "open",
        }
    }

    /// Parse a settings/CLI key, tolerating case and a couple of synonyms.
    #[must_use]
    pub fn from_config_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "emergency" | "emergency_only" => Some(Self::Emergency),
            "open" | "open_now" => Some(Self::Open),
            _ => None,
        }
    }
}

/// Search radius: one preset from the ladder, or the user-supplied custom
/// value. Exactly one choice is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadiusChoice {
    /// A preset from [`RADIUS_LADDER`], in meters.
    Preset(u32),
    /// The custom value held in `AppState::custom_radius_m`.
    Custom,
}

impl RadiusChoice {
    /// Resolve the active radius in meters given the current custom value.
    #[must_use]
    pub fn meters(self, custom_radius_m: u32) -> u32 {
        match self {
            Self::Preset(m) => m,
            Self::Custom => custom_radius_m,
        }
    }
}

/// One debounced search intent sent to the coordinator worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryInput {
    /// Monotonic generation token used to discard superseded results.
    pub id: u64,
    /// Search origin.
    pub origin: Coordinate,
    /// Active radius in meters.
    pub radius_m: u32,
    /// Active category filter.
    pub category: CategoryFilter,
    /// Triage urgency forwarded to the backend.
    pub urgency: UrgencyLevel,
    /// Result-set cap requested from the backend.
    pub max_results: u32,
}

/// A facility list produced by one dispatch, live or from the cache slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchBatch {
    /// Facilities in backend order (ascending distance).
    pub facilities: Vec<Facility>,
    /// `true` when the list came from the offline cache.
    pub from_cache: bool,
}

/// Result of one dispatch, tagged with its originating generation token.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Echoed token from the originating [`QueryInput`].
    pub id: u64,
    /// The list, or the error that survived the cache-fallback path.
    pub result: Result<SearchBatch, FindError>,
}

/// The user's chosen facility. Carries a full snapshot so detail views keep
/// working even when the id has dropped out of the current list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Id of the chosen facility.
    pub facility_id: String,
    /// Snapshot taken at selection time; may be stale.
    pub facility: Facility,
}

/// Repository phase. All non-`Loading` phases are stable until the next
/// triggering input; there is no terminal phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    /// No coordinate acquired yet.
    #[default]
    Init,
    /// A dispatch is in flight (or debouncing).
    Loading,
    /// Live fetch succeeded with a non-empty list.
    SuccessLive,
    /// Live fetch failed; showing the cached snapshot.
    SuccessCached,
    /// Live fetch succeeded but matched nothing; offers ladder expansion.
    Empty,
    /// Nothing to show: location failed, or fetch failed with an empty cache.
    Error,
}

/// Central mutable state of the facility repository, shared by the runtime
/// loop and the logic layer.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Current repository phase.
    pub phase: LoadState,
    /// Last known coordinate, live or manually submitted.
    pub location: Option<Coordinate>,
    /// Whether connectivity is currently reported lost.
    pub offline: bool,
    /// Whether the displayed list came from the cache slot.
    pub using_cache: bool,
    /// Last loaded facility list, unfiltered, in backend order.
    pub facilities: Vec<Facility>,
    /// Error behind the `Error` phase, if any.
    pub error: Option<FindError>,
    /// Active radius choice.
    pub radius: RadiusChoice,
    /// Custom radius in meters, active when `radius` is `Custom`.
    pub custom_radius_m: u32,
    /// Active category filter.
    pub category: CategoryFilter,
    /// Triage urgency read from the durable triage slot at startup.
    pub urgency: UrgencyLevel,
    /// Result-set cap forwarded to the backend.
    pub max_results: u32,
    /// Active selection, if any.
    pub selected: Option<Selection>,
    /// When set, freshly loaded lists do not steal the selection.
    pub suppress_auto_select: bool,
    /// Token of the newest query issued; outcomes with other tokens are
    /// discarded at commit time.
    pub latest_query_id: u64,
    /// Next generation token to allocate.
    pub next_query_id: u64,
    /// Whether a refresh is in flight (drives the "Updating…" hint).
    pub refreshing: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            phase: LoadState::Init,
            location: None,
            offline: false,
            using_cache: false,
            facilities: Vec::new(),
            error: None,
            radius: RadiusChoice::Preset(10_000),
            custom_radius_m: DEFAULT_CUSTOM_RADIUS_M,
            category: CategoryFilter::All,
            urgency: UrgencyLevel::Routine,
            max_results: 12,
            selected: None,
            suppress_auto_select: false,
            latest_query_id: 0,
            next_query_id: 1,
            refreshing: false,
        }
    }
}

impl AppState {
    /// Active radius in meters, resolving the preset/custom choice.
    #[must_use]
    pub fn active_radius_m(&self) -> u32 {
        self.radius.meters(self.custom_radius_m)
    }

    /// The facility list as exposed to consumers: radius and category
    /// filters applied over the last loaded list, backend order preserved.
    #[must_use]
    pub fn visible(&self) -> Vec<Facility> {
        crate::filter::apply(&self.facilities, self.active_radius_m(), self.category)
    }

    /// Empty-state hint naming the active radius.
    #[must_use]
    pub fn empty_hint(&self) -> String {
        format!(
            "No facilities within {} km. Try expanding.",
            self.active_radius_m() / 1000
        )
    }
}
