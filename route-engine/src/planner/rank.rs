//! Itinerary ranking for search results.
//!
//! Orders a Pareto set for presentation. Ranking never changes which
//! itineraries are returned, only their order.

use std::collections::HashSet;

use crate::domain::{Criterion, EdgeId, Itinerary, PreferenceProfile};

/// Preference-weighted score of each itinerary, lower is better.
///
/// Each criterion is normalised by its largest value in the set, so the
/// weights compare like with like. A criterion that is zero everywhere
/// contributes nothing.
pub fn score_itineraries(itineraries: &[Itinerary], preference: &PreferenceProfile) -> Vec<f64> {
    let max_of = |criterion: Criterion| {
        itineraries
            .iter()
            .map(|it| it.criteria().get(criterion))
            .fold(0.0_f64, f64::max)
    };
    let weights = [
        (Criterion::Duration, preference.duration_weight),
        (Criterion::Fare, preference.fare_weight),
        (Criterion::Transfers, preference.transfer_weight),
    ];
    let maxima: Vec<(Criterion, f64, f64)> = weights
        .iter()
        .map(|&(criterion, weight)| (criterion, weight, max_of(criterion)))
        .collect();

    itineraries
        .iter()
        .map(|it| {
            let criteria = it.criteria();
            maxima
                .iter()
                .filter(|(_, _, max)| *max > 0.0)
                .map(|&(criterion, weight, max)| weight * criteria.get(criterion) / max)
                .sum()
        })
        .collect()
}

/// Rank itineraries by preference.
///
/// Sorted by ascending score; ties go to the itinerary with fewer edges,
/// then keep their input order.
///
/// # Examples
///
/// ```
/// use route_engine::domain::{EdgeId, Itinerary, Leg, Mode, NodeId, PreferenceProfile};
/// use route_engine::planner::rank_itineraries;
/// use chrono::{TimeZone, Utc};
///
/// let depart = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
/// let leg = |edge, from, to, mode, mins, fare| Leg {
///     edge: EdgeId(edge),
///     from: NodeId(from),
///     to: NodeId(to),
///     mode,
///     departure: depart,
///     wait_mins: 0.0,
///     travel_mins: mins,
///     fare,
///     transfer: false,
/// };
///
/// let walk = Itinerary::new(NodeId(0), depart, vec![leg(0, 0, 1, Mode::Walk, 30.0, 0.0)]).unwrap();
/// let boda = Itinerary::new(NodeId(0), depart, vec![leg(1, 0, 1, Mode::Boda, 8.0, 3.0)]).unwrap();
///
/// let fastest = rank_itineraries(vec![walk.clone(), boda.clone()], &PreferenceProfile::fastest());
/// assert_eq!(fastest[0], boda);
///
/// let cheapest = rank_itineraries(vec![walk.clone(), boda], &PreferenceProfile::cheapest());
/// assert_eq!(cheapest[0], walk);
/// ```
pub fn rank_itineraries(
    itineraries: Vec<Itinerary>,
    preference: &PreferenceProfile,
) -> Vec<Itinerary> {
    let scores = score_itineraries(&itineraries, preference);
    let mut scored: Vec<(f64, Itinerary)> = scores.into_iter().zip(itineraries).collect();

    scored.sort_by(|(a_score, a), (b_score, b)| {
        a_score
            .total_cmp(b_score)
            .then(a.edge_count().cmp(&b.edge_count()))
    });

    scored.into_iter().map(|(_, it)| it).collect()
}

/// Remove dominated itineraries.
///
/// An itinerary is dominated if another one is no worse in duration, fare
/// and transfers, and strictly better in at least one. Survivors keep their
/// input order.
pub fn remove_dominated(itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    if itineraries.len() <= 1 {
        return itineraries;
    }

    let mut result: Vec<Itinerary> = Vec::with_capacity(itineraries.len());

    for itinerary in itineraries {
        if result.iter().any(|existing| existing.dominates(&itinerary)) {
            continue;
        }
        // Also remove any existing itineraries dominated by this one
        result.retain(|existing| !itinerary.dominates(existing));
        result.push(itinerary);
    }

    result
}

/// Deduplicate itineraries that take the same sequence of edges.
///
/// Merged sub-searches can find the same path from several departure
/// times; the first occurrence is kept.
pub fn deduplicate(itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    if itineraries.len() <= 1 {
        return itineraries;
    }

    let mut seen: HashSet<Vec<EdgeId>> = HashSet::new();
    itineraries
        .into_iter()
        .filter(|it| seen.insert(it.edge_ids().collect()))
        .collect()
}
