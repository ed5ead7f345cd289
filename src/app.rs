//! Facility repository runtime (workers, channels, and the event loop).
//!
//! This module wires the pieces into one state machine: the location
//! worker feeds coordinate fixes, the search coordinator feeds dispatch
//! outcomes, and embedder commands arrive over the [`RepoInput`] channel.
//! All three streams drain into a single `select!` loop that routes them
//! through [`crate::logic`] and keeps the whole machine single-writer.
//! Worker tasks are aborted on the way out so nothing mutates state after
//! disposal.

use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::mpsc;

use crate::cache::FacilityCache;
use crate::config::Settings;
use crate::location::{
    ConnectivityEvent, GeoSource, LocationEvent, WatchOptions, spawn_location_worker,
};
use crate::logic;
use crate::net::{FacilityBackend, HttpBackend};
use crate::search::{CoordinatorConfig, spawn_search_worker};
use crate::selection::SelectionStore;
use crate::state::{
    AppState, CategoryFilter, Coordinate, Facility, LoadState, QueryInput, RadiusChoice,
    SearchOutcome,
};
use crate::storage::{Storage, triage_urgency};
use crate::util::fmt_km;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Commands an embedder (or the CLI) can feed into the running repository.
#[derive(Clone, Debug)]
pub enum RepoInput {
    /// A manually entered location, already resolved to a coordinate by the
    /// external geocoding collaborator.
    ManualLocation(Coordinate),
    /// Switch the category filter.
    SetCategory(CategoryFilter),
    /// Activate a radius choice.
    SetRadius(RadiusChoice),
    /// Update the custom radius value in meters.
    SetCustomRadius(u32),
    /// Advance the radius ladder one step (the empty-state affordance).
    ExpandRadius,
    /// Re-dispatch with the current coordinate and filters.
    Refresh,
    /// Persist an explicit facility pick.
    Select(Facility),
    /// Connectivity transition reported by the platform.
    Connectivity(ConnectivityEvent),
}

/// Run the facility repository until it settles (or indefinitely).
///
/// With `watch_mode` off the loop exits at the first stable phase (the
/// CLI's one-shot mode). With it on, the loop keeps reacting to location
/// fixes, connectivity transitions, and [`RepoInput`] commands until every
/// input channel closes.
///
/// `cache_storage` backs the facility snapshot slot; `state_storage` backs
/// the selection slot and the read-only triage input.
pub async fn run(
    source: Arc<dyn GeoSource>,
    settings: Settings,
    cache_storage: Arc<dyn Storage>,
    state_storage: Arc<dyn Storage>,
    input_rx: mpsc::UnboundedReceiver<RepoInput>,
    watch_mode: bool,
) -> Result<AppState> {
    let backend = Arc::new(HttpBackend::new(
        settings.api_base.clone(),
        Duration::from_secs(settings.request_timeout_secs),
    ));
    run_with_backend(
        source,
        settings,
        backend,
        cache_storage,
        state_storage,
        input_rx,
        watch_mode,
    )
    .await
}

/// [`run`] with an injected backend, for embedders and tests that script
/// responses without a network.
pub async fn run_with_backend(
    source: Arc<dyn GeoSource>,
    settings: Settings,
    backend: Arc<dyn FacilityBackend>,
    cache_storage: Arc<dyn Storage>,
    state_storage: Arc<dyn Storage>,
    mut input_rx: mpsc::UnboundedReceiver<RepoInput>,
    watch_mode: bool,
) -> Result<AppState> {
    let cache = FacilityCache::new(cache_storage);
    let selection = SelectionStore::new(Arc::clone(&state_storage));

    let mut app = AppState {
        radius: settings.radius,
        custom_radius_m: settings.custom_radius_m,
        category: settings.category,
        urgency: triage_urgency(state_storage.as_ref()),
        max_results: settings.max_results,
        ..Default::default()
    };
    app.selected = selection.load();
    tracing::info!(urgency = ?app.urgency, radius_m = app.active_radius_m(), "repository starting");

    let (location_tx, mut location_rx) = mpsc::unbounded_channel::<LocationEvent>();
    let (query_tx, query_rx) = mpsc::unbounded_channel::<QueryInput>();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<SearchOutcome>();

    let location_handle = spawn_location_worker(
        source,
        WatchOptions::default(),
        Duration::from_secs(settings.location_timeout_secs),
        location_tx,
    );
    let search_handle = spawn_search_worker(
        backend,
        cache.clone(),
        CoordinatorConfig {
            debounce: Duration::from_millis(settings.debounce_ms),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        },
        query_rx,
        outcome_tx,
    );

    // A finite source (one static fix) closes its channel early; that must
    // not end the loop while a dispatch is still in flight.
    let mut location_open = true;
    let mut input_open = true;
    loop {
        if !location_open && !input_open && !app.refreshing {
            break;
        }
        select! {
            event = location_rx.recv(), if location_open => {
                match event {
                    Some(LocationEvent::Fix(coord)) => {
                        tracing::debug!(lat = coord.lat, lng = coord.lng, "coordinate fix");
                        logic::record_fix(&mut app, coord);
                        logic::send_query(&mut app, &query_tx);
                    }
                    Some(LocationEvent::Failed(err)) => {
                        tracing::warn!(error = %err, "location acquisition failed");
                        logic::record_location_failure(&mut app, &cache, &selection, err);
                        if !watch_mode && is_stable(app.phase) {
                            break;
                        }
                    }
                    None => location_open = false,
                }
            }
            outcome = outcome_rx.recv() => {
                let Some(outcome) = outcome else { break };
                logic::commit_outcome(&mut app, &selection, outcome);
                if !watch_mode && is_stable(app.phase) {
                    break;
                }
            }
            input = input_rx.recv(), if input_open => {
                match input {
                    Some(input) => handle_input(&mut app, &selection, &query_tx, input),
                    None => input_open = false,
                }
            }
        }
    }

    // No state mutation may survive disposal: kill the debounce timer and
    // any in-flight dispatch with the workers.
    location_handle.abort();
    search_handle.abort();
    tracing::info!(phase = ?app.phase, shown = app.visible().len(), "repository settled");
    Ok(app)
}

fn is_stable(phase: LoadState) -> bool {
    !matches!(phase, LoadState::Init | LoadState::Loading)
}

/// Route one embedder command into the logic layer, re-querying where the
/// transition calls for it.
pub fn handle_input(
    app: &mut AppState,
    selection: &SelectionStore,
    query_tx: &mpsc::UnboundedSender<QueryInput>,
    input: RepoInput,
) {
    match input {
        RepoInput::ManualLocation(coord) => {
            logic::submit_manual_location(app, coord);
            logic::send_query(app, query_tx);
        }
        RepoInput::SetCategory(category) => {
            if logic::set_category(app, category) {
                logic::send_query(app, query_tx);
            }
        }
        RepoInput::SetRadius(choice) => {
            if logic::set_radius(app, choice) {
                logic::send_query(app, query_tx);
            }
        }
        RepoInput::SetCustomRadius(meters) => {
            if logic::set_custom_radius(app, meters) {
                logic::send_query(app, query_tx);
            }
        }
        RepoInput::ExpandRadius => {
            logic::expand_radius(app);
            logic::send_query(app, query_tx);
        }
        RepoInput::Refresh => {
            logic::send_query(app, query_tx);
        }
        RepoInput::Select(facility) => {
            logic::select_facility(app, selection, &facility);
        }
        RepoInput::Connectivity(event) => {
            let online = matches!(event, ConnectivityEvent::Online);
            if logic::set_connectivity(app, online) {
                logic::send_query(app, query_tx);
            }
        }
    }
}

/// Render the settled state as plain text: banners, then the filtered
/// list, then the active selection. This is the surface the CLI prints and
/// what an out-of-scope map/list view would consume.
#[must_use]
pub fn summary(app: &AppState) -> String {
    let mut lines = Vec::new();
    if app.offline {
        lines.push("Showing cached results (offline).".to_string());
    } else if app.using_cache {
        lines.push("Using offline data — refreshing now.".to_string());
    }
    match app.phase {
        LoadState::Error => {
            if let Some(err) = &app.error {
                lines.push(err.to_string());
            }
        }
        LoadState::Empty => {
            lines.push(app.empty_hint());
        }
        _ => {
            for (i, f) in app.visible().iter().enumerate() {
                lines.push(format!(
                    "{:2}. {} [{}] | {} | {} | {} | {}",
                    i + 1,
                    f.name,
                    f.kind.label(),
                    fmt_km(f.distance_km),
                    f.status.label(),
                    f.wait_label,
                    f.phone,
                ));
            }
            if let Some(sel) = &app.selected {
                lines.push(format!("Selected: {}", sel.facility.name));
            }
        }
    }
    lines.join("\n")
}
