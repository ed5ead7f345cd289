//! Integration tests for the filter engine and the repository state machine.

use std::sync::Arc;

use tokio::sync::mpsc;

use carefinder::cache::FacilityCache;
use carefinder::error::FindError;
use carefinder::filter;
use carefinder::logic;
use carefinder::selection::SelectionStore;
use carefinder::state::{
    AppState, CategoryFilter, Coordinate, Facility, FacilityType, LoadState, OpenStatus,
    QueryInput, RadiusChoice, SearchBatch, SearchOutcome, WaitLevel,
};
use carefinder::storage::{MemoryStorage, Storage};

fn facility(
    id: &str,
    kind: FacilityType,
    status: OpenStatus,
    distance_km: Option<f64>,
) -> Facility {
    Facility {
        id: id.to_string(),
        name: format!("{id} facility"),
        kind,
        location: Coordinate { lat: 12.9716, lng: 77.5946 },
        status,
        opens_at: None,
        wait: WaitLevel::Low,
        wait_label: WaitLevel::Low.label().to_string(),
        specialties: vec!["General Care".to_string()],
        phone: "+91 00000 00000".to_string(),
        distance_km,
        travel_time_mins: Some(10),
        directions_url: None,
        call_url: None,
    }
}

fn stores() -> (FacilityCache, SelectionStore) {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    (
        FacilityCache::new(Arc::clone(&storage)),
        SelectionStore::new(storage),
    )
}

fn app_with_location() -> AppState {
    AppState {
        location: Some(Coordinate { lat: 12.9716, lng: 77.5946 }),
        ..Default::default()
    }
}

#[test]
fn filter_all_keeps_exactly_the_radius_subset_in_order() {
    let input = vec![
        facility("a", FacilityType::Phc, OpenStatus::Open, Some(1.0)),
        facility("b", FacilityType::Chc, OpenStatus::Closed, Some(9.9)),
        facility("c", FacilityType::Dh, OpenStatus::Open, Some(10.0)),
        facility("d", FacilityType::Sdh, OpenStatus::Open, Some(10.1)),
        facility("e", FacilityType::Private, OpenStatus::Unknown, None),
    ];
    let out = filter::apply(&input, 10_000, CategoryFilter::All);
    let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn filter_contract_example_keeps_only_f1() {
    // origin (12.9716, 77.5946), radius 10000, distances 3 / 12 / unknown
    let input = vec![
        facility("f1", FacilityType::Phc, OpenStatus::Open, Some(3.0)),
        facility("f2", FacilityType::Chc, OpenStatus::Open, Some(12.0)),
        facility("f3", FacilityType::Dh, OpenStatus::Open, None),
    ];
    let out = filter::apply(&input, 10_000, CategoryFilter::All);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "f1");
}

#[test]
fn filter_emergency_keeps_only_emergency_capable_tiers() {
    let input = vec![
        facility("phc", FacilityType::Phc, OpenStatus::Open, Some(1.0)),
        facility("dh", FacilityType::Dh, OpenStatus::Closed, Some(2.0)),
        facility("mc", FacilityType::MedicalCollege, OpenStatus::Unknown, Some(3.0)),
        facility("priv", FacilityType::Private, OpenStatus::Open, Some(4.0)),
    ];
    let out = filter::apply(&input, 20_000, CategoryFilter::Emergency);
    assert!(
        out.iter()
            .all(|f| matches!(f.kind, FacilityType::Dh | FacilityType::MedicalCollege))
    );
    let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["dh", "mc"]);
}

#[test]
fn filter_open_keeps_only_confirmed_open() {
    let input = vec![
        facility("open", FacilityType::Phc, OpenStatus::Open, Some(1.0)),
        facility("closed", FacilityType::Chc, OpenStatus::Closed, Some(2.0)),
        facility("unknown", FacilityType::Dh, OpenStatus::Unknown, Some(3.0)),
    ];
    let out = filter::apply(&input, 20_000, CategoryFilter::Open);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "open");
}

#[test]
fn filter_is_pure_and_idempotent() {
    let input = vec![
        facility("a", FacilityType::Phc, OpenStatus::Open, Some(1.0)),
        facility("b", FacilityType::Dh, OpenStatus::Closed, Some(30.0)),
        facility("c", FacilityType::Chc, OpenStatus::Open, None),
    ];
    let before = input.clone();
    let first = filter::apply(&input, 5_000, CategoryFilter::All);
    let second = filter::apply(&input, 5_000, CategoryFilter::All);
    assert_eq!(first, second);
    assert_eq!(input, before);
}

#[test]
fn live_success_lands_in_success_live_and_selects_first() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx);
    assert_eq!(app.phase, LoadState::Loading);

    let query_id = app.latest_query_id;
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: query_id,
            result: Ok(SearchBatch {
                facilities: vec![
                    facility("first", FacilityType::Dh, OpenStatus::Open, Some(2.0)),
                    facility("second", FacilityType::Phc, OpenStatus::Open, Some(4.0)),
                ],
                from_cache: false,
            }),
        },
    );
    assert_eq!(app.phase, LoadState::SuccessLive);
    assert!(!app.using_cache);
    assert_eq!(app.selected.as_ref().unwrap().facility_id, "first");
    // The pick is durable, not just in-memory.
    assert_eq!(selection.load().unwrap().facility_id, "first");
}

#[test]
fn empty_live_success_lands_in_empty_without_error() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx);
    let query_id = app.latest_query_id;
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: query_id,
            result: Ok(SearchBatch {
                facilities: Vec::new(),
                from_cache: false,
            }),
        },
    );
    assert_eq!(app.phase, LoadState::Empty);
    assert_eq!(app.error, None);
    assert_eq!(app.empty_hint(), "No facilities within 10 km. Try expanding.");
}

#[test]
fn cached_batch_lands_in_success_cached() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx);
    let query_id = app.latest_query_id;
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: query_id,
            result: Ok(SearchBatch {
                facilities: vec![facility("c1", FacilityType::Chc, OpenStatus::Open, Some(1.0))],
                from_cache: true,
            }),
        },
    );
    assert_eq!(app.phase, LoadState::SuccessCached);
    assert!(app.using_cache);
}

#[test]
fn failed_fetch_with_empty_cache_lands_in_error_with_generic_message() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx);
    let query_id = app.latest_query_id;
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: query_id,
            result: Err(FindError::NetworkTimeout),
        },
    );
    assert_eq!(app.phase, LoadState::Error);
    assert!(app.facilities.is_empty());
    assert_eq!(
        app.error.as_ref().unwrap().to_string(),
        "Unable to load facilities right now. Please try again."
    );
}

#[test]
fn stale_outcome_never_overwrites_a_newer_commit() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx); // generation A
    let earlier = app.latest_query_id;
    logic::send_query(&mut app, &tx); // generation B supersedes A
    let later = app.latest_query_id;
    assert!(later > earlier);

    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: later,
            result: Ok(SearchBatch {
                facilities: vec![facility("new", FacilityType::Dh, OpenStatus::Open, Some(1.0))],
                from_cache: false,
            }),
        },
    );
    // Generation A resolves afterwards; its payload must be discarded.
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: earlier,
            result: Ok(SearchBatch {
                facilities: vec![facility("old", FacilityType::Phc, OpenStatus::Open, Some(9.0))],
                from_cache: false,
            }),
        },
    );
    assert_eq!(app.facilities.len(), 1);
    assert_eq!(app.facilities[0].id, "new");
    assert_eq!(app.selected.as_ref().unwrap().facility_id, "new");
}

#[test]
fn suppressed_auto_select_keeps_the_existing_pick() {
    let (_, selection) = stores();
    let mut app = app_with_location();
    app.suppress_auto_select = true;
    let chosen = facility("mine", FacilityType::Private, OpenStatus::Open, Some(5.0));
    logic::select_facility(&mut app, &selection, &chosen);

    let (tx, _rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::send_query(&mut app, &tx);
    let query_id = app.latest_query_id;
    logic::commit_outcome(
        &mut app,
        &selection,
        SearchOutcome {
            id: query_id,
            result: Ok(SearchBatch {
                facilities: vec![facility("first", FacilityType::Dh, OpenStatus::Open, Some(1.0))],
                from_cache: false,
            }),
        },
    );
    assert_eq!(app.selected.as_ref().unwrap().facility_id, "mine");
}

#[test]
fn radius_ladder_expands_five_ten_twenty_then_custom() {
    let mut app = AppState {
        radius: RadiusChoice::Preset(5_000),
        ..Default::default()
    };
    assert!(logic::expand_radius(&mut app));
    assert_eq!(app.radius, RadiusChoice::Preset(10_000));
    assert!(logic::expand_radius(&mut app));
    assert_eq!(app.radius, RadiusChoice::Preset(20_000));
    assert!(logic::expand_radius(&mut app));
    assert_eq!(app.radius, RadiusChoice::Custom);
    assert_eq!(app.custom_radius_m, 30_000);
    // Already custom: the ladder has nowhere further to go.
    assert!(!logic::expand_radius(&mut app));
}

#[test]
fn ladder_expansion_never_shrinks_a_wide_custom_radius() {
    let mut app = AppState {
        radius: RadiusChoice::Preset(20_000),
        custom_radius_m: 50_000,
        ..Default::default()
    };
    logic::expand_radius(&mut app);
    assert_eq!(app.radius, RadiusChoice::Custom);
    assert_eq!(app.custom_radius_m, 50_000);
}

#[test]
fn manual_location_moves_error_state_back_to_loading() {
    let (cache, selection) = stores();
    let mut app = AppState::default();
    logic::record_location_failure(&mut app, &cache, &selection, FindError::LocationDenied);
    assert_eq!(app.phase, LoadState::Error);

    let (tx, mut rx) = mpsc::unbounded_channel::<QueryInput>();
    logic::submit_manual_location(&mut app, Coordinate { lat: 12.9716, lng: 77.5946 });
    assert!(logic::send_query(&mut app, &tx));
    assert_eq!(app.phase, LoadState::Loading);
    assert_eq!(app.error, None);
    let sent = rx.try_recv().unwrap();
    assert_eq!(sent.origin, Coordinate { lat: 12.9716, lng: 77.5946 });
}

#[test]
fn location_failure_falls_back_to_cache_before_any_coordinate() {
    let (cache, selection) = stores();
    cache.save(&[facility("cached", FacilityType::Chc, OpenStatus::Open, Some(2.0))]);
    let mut app = AppState::default();
    logic::record_location_failure(&mut app, &cache, &selection, FindError::LocationTimeout);
    assert_eq!(app.phase, LoadState::SuccessCached);
    assert!(app.using_cache);
    assert_eq!(app.selected.as_ref().unwrap().facility_id, "cached");
    // The acquisition error stays for the manual-entry affordance.
    assert_eq!(app.error, Some(FindError::LocationTimeout));
}

#[test]
fn regaining_connectivity_triggers_exactly_one_refetch_with_last_coordinate() {
    let mut app = app_with_location();
    app.phase = LoadState::SuccessLive;

    let (tx, mut rx) = mpsc::unbounded_channel::<QueryInput>();
    assert!(!logic::set_connectivity(&mut app, false));
    assert!(app.offline);

    if logic::set_connectivity(&mut app, true) {
        logic::send_query(&mut app, &tx);
    }
    assert!(!app.offline);
    let sent = rx.try_recv().expect("one refetch expected");
    assert_eq!(sent.origin, Coordinate { lat: 12.9716, lng: 77.5946 });
    assert!(rx.try_recv().is_err(), "exactly one refetch expected");
}

#[test]
fn send_query_without_a_coordinate_sends_nothing() {
    let mut app = AppState::default();
    let (tx, mut rx) = mpsc::unbounded_channel::<QueryInput>();
    assert!(!logic::send_query(&mut app, &tx));
    assert!(rx.try_recv().is_err());
    assert_eq!(app.phase, LoadState::Init);
}

#[test]
fn filter_changes_reissue_with_fresh_generations() {
    let mut app = app_with_location();
    let (tx, mut rx) = mpsc::unbounded_channel::<QueryInput>();

    assert!(logic::set_category(&mut app, CategoryFilter::Emergency));
    logic::send_query(&mut app, &tx);
    assert!(logic::set_radius(&mut app, RadiusChoice::Preset(20_000)));
    logic::send_query(&mut app, &tx);

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert!(second.id > first.id);
    assert_eq!(second.radius_m, 20_000);
    assert_eq!(app.latest_query_id, second.id);
    // Repeating the same values is not a change and must not re-dispatch.
    assert!(!logic::set_category(&mut app, CategoryFilter::Emergency));
    assert!(!logic::set_radius(&mut app, RadiusChoice::Preset(20_000)));
}

#[test]
fn a_late_fix_clears_a_pending_location_error() {
    let (cache, selection) = stores();
    let mut app = AppState::default();
    logic::record_location_failure(&mut app, &cache, &selection, FindError::LocationTimeout);
    assert_eq!(app.phase, LoadState::Error);

    logic::record_fix(&mut app, Coordinate { lat: 1.0, lng: 2.0 });
    assert_eq!(app.error, None);
    assert_eq!(app.location, Some(Coordinate { lat: 1.0, lng: 2.0 }));
}
