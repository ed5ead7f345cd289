//! State transitions of the facility repository.
//!
//! Every transition of the phase machine lives here as a plain function
//! over [`AppState`], so the whole machine is testable without the runtime
//! loop: the loop in [`crate::app`] only routes channel messages into these
//! functions.
//!
//! Query generations: [`send_query`] allocates a fresh monotonic id and
//! records it as the latest; [`commit_outcome`] drops any outcome carrying
//! an older id, so a superseded in-flight dispatch can never overwrite
//! state committed by a newer one, no matter how late it resolves.

use tokio::sync::mpsc;

use crate::cache::FacilityCache;
use crate::error::FindError;
use crate::selection::SelectionStore;
use crate::state::{
    AppState, CategoryFilter, Coordinate, EXPANDED_CUSTOM_RADIUS_M, Facility, LoadState,
    QueryInput, RADIUS_LADDER, RadiusChoice, SearchOutcome,
};

/// Issue a search for the current state over `query_tx` with a fresh
/// generation id, moving the phase to `Loading`.
///
/// Returns `false` (sending nothing) when no coordinate is known yet:
/// there is nothing to search around.
pub fn send_query(app: &mut AppState, query_tx: &mpsc::UnboundedSender<QueryInput>) -> bool {
    let Some(origin) = app.location else {
        return false;
    };
    let id = app.next_query_id;
    app.next_query_id += 1;
    app.latest_query_id = id;
    app.refreshing = true;
    app.phase = LoadState::Loading;
    let _ = query_tx.send(QueryInput {
        id,
        origin,
        radius_m: app.active_radius_m(),
        category: app.category,
        urgency: app.urgency,
        max_results: app.max_results,
    });
    true
}

/// Commit a dispatch outcome into the state, enforcing "latest intent
/// wins": an outcome whose id is not the latest issued id is discarded.
pub fn commit_outcome(app: &mut AppState, store: &SelectionStore, outcome: SearchOutcome) {
    if outcome.id != app.latest_query_id {
        tracing::debug!(
            id = outcome.id,
            latest = app.latest_query_id,
            "discarding superseded search outcome"
        );
        return;
    }
    app.refreshing = false;
    match outcome.result {
        Ok(batch) => {
            app.using_cache = batch.from_cache;
            app.facilities = batch.facilities;
            if app.facilities.is_empty() {
                app.phase = LoadState::Empty;
                app.error = None;
            } else {
                app.phase = if batch.from_cache {
                    LoadState::SuccessCached
                } else {
                    LoadState::SuccessLive
                };
                app.error = None;
                auto_select(app, store);
            }
        }
        Err(err) => {
            app.facilities.clear();
            app.using_cache = false;
            app.phase = LoadState::Error;
            app.error = Some(err);
        }
    }
}

/// Advance the selection to the first element of a freshly loaded list,
/// unless suppression is on and a selection already exists.
pub fn auto_select(app: &mut AppState, store: &SelectionStore) {
    if app.suppress_auto_select && app.selected.is_some() {
        return;
    }
    if let Some(first) = app.facilities.first() {
        app.selected = Some(store.select(first));
    }
}

/// Persist an explicit user pick as the active selection.
pub fn select_facility(app: &mut AppState, store: &SelectionStore, facility: &Facility) {
    app.selected = Some(store.select(facility));
}

/// Record a coordinate fix. Clears a pending location error (a late fix
/// after an acquisition timeout recovers the session); the caller follows
/// up with [`send_query`].
pub fn record_fix(app: &mut AppState, coord: Coordinate) {
    app.location = Some(coord);
    if app.error.as_ref().is_some_and(FindError::is_location) {
        app.error = None;
    }
}

/// Record a location-acquisition failure.
///
/// While a list is already on screen the failure only annotates the state.
/// With nothing to show, the cache is consulted one last time (the
/// "before any coordinate is available" read): a non-empty snapshot lands
/// in `SuccessCached`, an empty one in `Error` with the manual-entry
/// affordance carried by the error's message.
pub fn record_location_failure(
    app: &mut AppState,
    cache: &FacilityCache,
    store: &SelectionStore,
    err: FindError,
) {
    app.error = Some(err);
    if !app.facilities.is_empty() {
        return;
    }
    let cached = cache.load();
    if cached.is_empty() {
        app.phase = LoadState::Error;
    } else {
        app.facilities = cached;
        app.using_cache = true;
        app.phase = LoadState::SuccessCached;
        auto_select(app, store);
    }
}

/// Submit a manually entered, already-geocoded coordinate. Clears the
/// error and leaves the caller to [`send_query`].
pub fn submit_manual_location(app: &mut AppState, coord: Coordinate) {
    app.location = Some(coord);
    app.error = None;
}

/// Switch the category filter. Returns whether anything changed.
pub fn set_category(app: &mut AppState, category: CategoryFilter) -> bool {
    if app.category == category {
        return false;
    }
    app.category = category;
    true
}

/// Activate a radius choice. Returns whether anything changed.
pub fn set_radius(app: &mut AppState, choice: RadiusChoice) -> bool {
    if app.radius == choice {
        return false;
    }
    app.radius = choice;
    true
}

/// Update the custom radius value. Returns whether the active radius
/// changed (i.e. the custom choice is selected and the value differs).
pub fn set_custom_radius(app: &mut AppState, meters: u32) -> bool {
    if app.custom_radius_m == meters {
        return false;
    }
    app.custom_radius_m = meters;
    app.radius == RadiusChoice::Custom
}

/// Advance the radius ladder one step: 5 km → 10 km → 20 km → custom.
///
/// Stepping onto the custom rung raises the custom value to at least the
/// expanded floor so "expand" always widens the search. Already-custom
/// radii stay put. Returns whether the choice moved.
pub fn expand_radius(app: &mut AppState) -> bool {
    match app.radius {
        RadiusChoice::Preset(current) => {
            match RADIUS_LADDER.iter().position(|&r| r == current) {
                Some(i) if i + 1 < RADIUS_LADDER.len() => {
                    app.radius = RadiusChoice::Preset(RADIUS_LADDER[i + 1]);
                }
                _ => {
                    app.radius = RadiusChoice::Custom;
                    if app.custom_radius_m < EXPANDED_CUSTOM_RADIUS_M {
                        app.custom_radius_m = EXPANDED_CUSTOM_RADIUS_M;
                    }
                }
            }
            true
        }
        RadiusChoice::Custom => false,
    }
}

/// Record a connectivity transition. Returns whether the caller should
/// refresh: regaining connectivity with a known coordinate triggers
/// exactly one refetch.
pub fn set_connectivity(app: &mut AppState, online: bool) -> bool {
    app.offline = !online;
    online && app.location.is_some()
}
