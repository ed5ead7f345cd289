//! Backend search client and response normalization.
//!
//! The backend contract is a single `POST {api_base}/facilities/search`
//! endpoint. This module owns the wire DTOs, the shared HTTP client, the
//! [`FacilityBackend`] seam the coordinator dispatches through, and the one
//! normalization step that turns raw records into canonical
//! [`Facility`] values. All optional-field fallbacks live here and nowhere
//! else:
//!
//! | field          | fallback                                    |
//! |----------------|---------------------------------------------|
//! | `is_open_now`  | `true`→open, `false`→closed, `null`→unknown |
//! | `wait_time`    | level rotation `[low, medium, high][i % 3]` |
//! | `specialties`  | `["General Care"]`                          |
//! | `contact_number` | `+91 00000 00000`                         |

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FindError;
use crate::state::{
    Coordinate, Facility, FacilityType, OpenStatus, QueryInput, UrgencyLevel, WaitLevel,
};

/// Phone placeholder substituted when the backend sends no contact number.
pub const PLACEHOLDER_PHONE: &str = "+91 00000 00000";

/// Specialty substituted when the backend sends none.
pub const DEFAULT_SPECIALTY: &str = "General Care";

/// Shared HTTP client with connection pooling for search dispatches.
/// The overall per-request deadline is applied per call; only the connect
/// timeout lives on the client.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("carefinder/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
});

/// JSON body of a search request, matching the backend contract.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchRequestBody {
    /// Origin latitude.
    pub user_lat: f64,
    /// Origin longitude.
    pub user_lng: f64,
    /// Triage urgency classification.
    pub urgency_level: UrgencyLevel,
    /// Search radius in whole kilometers, at least 1.
    pub radius_km: u32,
    /// Result-set cap.
    pub max_results: u32,
    /// `Some(true)` when filtering to open facilities, `null` otherwise.
    pub open_now: Option<bool>,
    /// `Some(true)` when filtering to emergency tiers, `null` otherwise.
    pub emergency_only: Option<bool>,
}

/// Wait-time indicator as sent by the backend.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WaitTimeRecord {
    /// Coarse level, when the backend computed one.
    #[serde(default)]
    pub level: Option<WaitLevel>,
    /// Display text, when the backend computed one.
    #[serde(default)]
    pub text: Option<String>,
}

/// One raw facility record from the backend. Unknown extra fields are
/// ignored; the backend sends more than this subsystem consumes.
#[derive(Clone, Debug, Deserialize)]
pub struct FacilityRecord {
    /// Backend identifier.
    pub id: String,
    /// Facility name.
    pub name: String,
    /// Administrative tier.
    pub facility_type: FacilityType,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Tri-state open flag: `null` means hours unavailable.
    #[serde(default)]
    pub is_open_now: Option<bool>,
    /// Reopening time, when known.
    #[serde(default)]
    pub opens_at: Option<String>,
    /// Wait indicator, when computed.
    #[serde(default)]
    pub wait_time: Option<WaitTimeRecord>,
    /// Offered specialties.
    #[serde(default)]
    pub specialties: Option<Vec<String>>,
    /// Contact number.
    #[serde(default)]
    pub contact_number: Option<String>,
    /// Road distance from the origin in kilometers.
    #[serde(default)]
    pub distance_km: Option<f64>,
    /// Estimated travel time in minutes.
    #[serde(default)]
    pub travel_time_mins: Option<u32>,
    /// Directions deep link.
    #[serde(default)]
    pub directions_url: Option<String>,
    /// Call deep link.
    #[serde(default)]
    pub call_url: Option<String>,
}

/// JSON body of a search response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResponseBody {
    /// Matching facilities ordered by ascending distance.
    #[serde(default)]
    pub facilities: Vec<FacilityRecord>,
}

/// Build the wire request for a query. The radius is converted to whole
/// kilometers and clamped to the backend's minimum of 1.
#[must_use]
pub fn request_body(query: &QueryInput) -> SearchRequestBody {
    let radius_km = ((f64::from(query.radius_m) / 1000.0).round() as u32).max(1);
    SearchRequestBody {
        user_lat: query.origin.lat,
        user_lng: query.origin.lng,
        urgency_level: query.urgency,
        radius_km,
        max_results: query.max_results,
        open_now: matches!(query.category, crate::state::CategoryFilter::Open).then_some(true),
        emergency_only: matches!(query.category, crate::state::CategoryFilter::Emergency)
            .then_some(true),
    }
}

/// Derive the tri-state status and the reopening time to retain.
///
/// An open facility drops any `opens_at` the backend may have sent; a
/// closed or unknown one keeps it for the status line.
#[must_use]
pub fn derive_status(
    is_open_now: Option<bool>,
    opens_at: Option<String>,
) -> (OpenStatus, Option<String>) {
    match is_open_now {
        Some(true) => (OpenStatus::Open, None),
        Some(false) => (OpenStatus::Closed, opens_at),
        None => (OpenStatus::Unknown, opens_at),
    }
}

/// Normalize a whole response into canonical facilities, applying the
/// documented default table. `index` feeds the wait-level rotation.
#[must_use]
pub fn normalize(body: SearchResponseBody) -> Vec<Facility> {
    body.facilities
        .into_iter()
        .enumerate()
        .map(|(index, record)| normalize_record(index, record))
        .collect()
}

fn normalize_record(index: usize, record: FacilityRecord) -> Facility {
    let (status, opens_at) = derive_status(record.is_open_now, record.opens_at);
    let wait = record
        .wait_time
        .as_ref()
        .and_then(|w| w.level)
        .unwrap_or_else(|| WaitLevel::from_index(index));
    let wait_label = record
        .wait_time
        .and_then(|w| w.text)
        .unwrap_or_else(|| wait.label().to_string());
    let specialties = match record.specialties {
        Some(list) if !list.is_empty() => list,
        _ => vec![DEFAULT_SPECIALTY.to_string()],
    };
    let phone = match record.contact_number {
        Some(number) if !number.trim().is_empty() => number,
        _ => PLACEHOLDER_PHONE.to_string(),
    };

    Facility {
        id: record.id,
        name: record.name,
        kind: record.facility_type,
        location: Coordinate {
            lat: record.latitude,
            lng: record.longitude,
        },
        status,
        opens_at,
        wait,
        wait_label,
        specialties,
        phone,
        distance_km: record.distance_km,
        travel_time_mins: record.travel_time_mins,
        directions_url: record.directions_url,
        call_url: record.call_url,
    }
}

/// The backend seam the coordinator dispatches through. Injected so tests
/// and embedders can script responses without a network.
#[async_trait]
pub trait FacilityBackend: Send + Sync {
    /// Run one search against the backend and return the raw response.
    async fn search(&self, query: &QueryInput) -> Result<SearchResponseBody, FindError>;
}

/// Production backend speaking the documented HTTP contract.
pub struct HttpBackend {
    base: String,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend against `api_base` with the given per-request
    /// deadline.
    #[must_use]
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base: api_base.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FacilityBackend for HttpBackend {
    async fn search(&self, query: &QueryInput) -> Result<SearchResponseBody, FindError> {
        let url = format!("{}/facilities/search", self.base.trim_end_matches('/'));
        let response = HTTP_CLIENT
            .post(&url)
            .timeout(self.timeout)
            .json(&request_body(query))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FindError::NetworkFailure(format!(
                "search returned status {status}"
            )));
        }
        response
            .json::<SearchResponseBody>()
            .await
            .map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FindError {
    if e.is_timeout() {
        FindError::NetworkTimeout
    } else {
        FindError::NetworkFailure(e.to_string())
    }
}
