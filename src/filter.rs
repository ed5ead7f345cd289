//! Pure radius/category filtering over a facility list.
//!
//! The backend returns facilities ordered by ascending distance; that order
//! is authoritative and must survive filtering untouched. Nothing in this
//! module sorts or mutates its input.

use crate::state::{CategoryFilter, Facility, OpenStatus};

/// Filter `facilities` down to those within `radius_m` meters that match
/// `category`, preserving input order.
///
/// Facilities without a known distance never pass the radius cut. The
/// `emergency` category keeps only emergency-capable tiers (District
/// Hospital, Medical College); `open` keeps only facilities confirmed open;
/// `all` applies no category restriction.
#[must_use]
pub fn apply(facilities: &[Facility], radius_m: u32, category: CategoryFilter) -> Vec<Facility> {
    facilities
        .iter()
        .filter(|f| within_radius(f, radius_m))
        .filter(|f| matches_category(f, category))
        .cloned()
        .collect()
}

fn within_radius(facility: &Facility, radius_m: u32) -> bool {
    match facility.distance_km {
        Some(km) => km * 1000.0 <= f64::from(radius_m),
        None => false,
    }
}

fn matches_category(facility: &Facility, category: CategoryFilter) -> bool {
    match category {
        CategoryFilter::All => true,
        CategoryFilter::Emergency => facility.kind.is_emergency_capable(),
        CategoryFilter::Open => facility.status == OpenStatus::Open,
    }
}
