//! Nearest-NGO ranking and assignment.
//!
//! Stateless and synchronous: every call works on a caller-owned snapshot of
//! candidates and returns borrowed views into it.

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::geo::{compute_distance_km, GeoPoint};

/// How many ranked matches are surfaced as "nearby NGOs informed".
pub const DEFAULT_TOP_K: usize = 2;

/// A registered NGO as read from the account store.
#[derive(Clone, Debug, PartialEq)]
pub struct NgoCandidate {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<String>,
    /// `None` when the stored coordinates were missing or malformed.
    pub location: Option<GeoPoint>,
}

impl NgoCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: None,
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_location(mut self, location: Option<GeoPoint>) -> Self {
        self.location = location;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedMatch<'a> {
    pub ngo: &'a NgoCandidate,
    pub distance_km: f64,
    /// Zero-based position after sorting; 0 is the nearest.
    pub rank: usize,
}

impl<'a> RankedMatch<'a> {
    pub fn id(&self) -> &'a str {
        &self.ngo.id
    }
}

/// Distance-ranked candidates, nearest first.
///
/// Candidates without a location are skipped. The sort is stable, so equal
/// distances keep their input order.
pub fn rank_candidates<'a>(source: &GeoPoint, candidates: &'a [NgoCandidate]) -> Vec<RankedMatch<'a>> {
    let mut ranked: Vec<RankedMatch<'a>> = candidates
        .iter()
        .filter_map(|ngo| {
            let location = ngo.location.as_ref()?;
            Some(RankedMatch {
                ngo,
                distance_km: compute_distance_km(source, location),
                rank: 0,
            })
        })
        .collect();

    ranked.sort_by_key(|m| OrderedFloat(m.distance_km));
    for (rank, m) in ranked.iter_mut().enumerate() {
        m.rank = rank;
    }
    ranked
}

/// The nearest candidate with usable coordinates, however far away it is.
pub fn nearest_assignment<'a>(source: &GeoPoint, candidates: &'a [NgoCandidate]) -> Option<RankedMatch<'a>> {
    rank_candidates(source, candidates).into_iter().next()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    pub top_k: usize,
    /// Matches farther than this are dropped. `None` means unlimited.
    pub max_radius_km: Option<f64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_radius_km: None,
        }
    }
}

impl MatchConfig {
    /// The effective radius; NaN, infinite and negative values disable it.
    pub fn radius_km(&self) -> Option<f64> {
        self.max_radius_km.filter(|r| r.is_finite() && *r >= 0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome<'a> {
    pub assigned: Option<RankedMatch<'a>>,
    pub nearby: Vec<RankedMatch<'a>>,
    /// Candidates that had coordinates and fell inside the radius.
    pub ranked_count: usize,
}

impl MatchOutcome<'_> {
    pub fn summary(&self) -> MatchSummary {
        MatchSummary {
            assigned_ngo_id: self.assigned.map(|m| m.id().to_string()),
            assigned_ngo_distance_km: self.assigned.map(|m| m.distance_km),
            nearby_ngos: self.nearby.iter().map(NearbyNgo::from).collect(),
        }
    }
}

/// Owned projection of a [`MatchOutcome`] in the shape persisted on reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub assigned_ngo_id: Option<String>,
    pub assigned_ngo_distance_km: Option<f64>,
    pub nearby_ngos: Vec<NearbyNgo>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyNgo {
    pub id: String,
    pub name: Option<String>,
    pub distance_km: f64,
    pub rank: usize,
}

impl From<&RankedMatch<'_>> for NearbyNgo {
    fn from(m: &RankedMatch<'_>) -> Self {
        Self {
            id: m.ngo.id.clone(),
            name: m.ngo.name.clone(),
            distance_km: m.distance_km,
            rank: m.rank,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GeoMatcher {
    config: MatchConfig,
}

impl GeoMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// [`rank_candidates`] with the configured radius applied.
    pub fn rank<'a>(&self, source: &GeoPoint, candidates: &'a [NgoCandidate]) -> Vec<RankedMatch<'a>> {
        let mut ranked = rank_candidates(source, candidates);
        if let Some(radius) = self.config.radius_km() {
            // Sorted ascending, so this only cuts a suffix and ranks stay contiguous.
            ranked.retain(|m| m.distance_km <= radius);
        }
        ranked
    }

    pub fn nearest<'a>(&self, source: &GeoPoint, candidates: &'a [NgoCandidate]) -> Option<RankedMatch<'a>> {
        self.rank(source, candidates).into_iter().next()
    }

    pub fn match_report<'a>(&self, source: &GeoPoint, candidates: &'a [NgoCandidate]) -> MatchOutcome<'a> {
        let ranked = self.rank(source, candidates);
        MatchOutcome {
            assigned: ranked.first().copied(),
            nearby: ranked.iter().take(self.config.top_k).copied().collect(),
            ranked_count: ranked.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::point_from_object;
    use serde_json::json;

    // Kilometers per degree of longitude on the equator.
    const KM_PER_DEGREE: f64 = 6_371.0 * std::f64::consts::PI / 180.0;

    fn at(lat: f64, lon: f64) -> Option<GeoPoint> {
        Some(GeoPoint::new(lat, lon).unwrap())
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(0.0, 0.0).unwrap()
    }

    fn km_east(id: &str, km: f64) -> NgoCandidate {
        NgoCandidate::new(id).with_location(at(0.0, km / KM_PER_DEGREE))
    }

    #[test]
    fn ranks_ascending_by_distance() {
        let candidates = vec![km_east("five", 5.0), km_east("one", 1.0), km_east("three", 3.0)];
        let ranked = rank_candidates(&origin(), &candidates);

        let ids: Vec<&str> = ranked.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["one", "three", "five"]);
        assert_eq!(ranked.iter().map(|m| m.rank).collect::<Vec<_>>(), vec![0, 1, 2]);
        for (m, expected) in ranked.iter().zip([1.0, 3.0, 5.0]) {
            assert!((m.distance_km - expected).abs() < 1e-6, "{} vs {expected}", m.distance_km);
        }
    }

    #[test]
    fn skips_candidates_without_coordinates() {
        let null_lat = json!({"lat": null, "lng": 10.0});
        let candidates = vec![
            NgoCandidate::new("a").with_location(at(1.0, 1.0)),
            NgoCandidate::new("b").with_location(point_from_object(&null_lat, "lat", "lng")),
            NgoCandidate::new("c").with_location(at(2.0, 2.0)),
        ];
        let ranked = rank_candidates(&origin(), &candidates);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|m| m.id() != "b"));
    }

    #[test]
    fn equal_distances_keep_input_order() {
        let candidates = vec![
            NgoCandidate::new("west").with_location(at(0.0, -1.0)),
            NgoCandidate::new("east").with_location(at(0.0, 1.0)),
            NgoCandidate::new("here").with_location(at(0.0, 0.0)),
            NgoCandidate::new("also-here").with_location(at(0.0, 0.0)),
        ];
        let ranked = rank_candidates(&origin(), &candidates);
        let ids: Vec<&str> = ranked.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["here", "also-here", "west", "east"]);
    }

    #[test]
    fn ranking_is_restartable() {
        let candidates = vec![km_east("x", 2.0), km_east("y", 1.0)];
        let first = rank_candidates(&origin(), &candidates);
        let second = rank_candidates(&origin(), &candidates);
        assert_eq!(first, second);
    }

    #[test]
    fn nearest_picks_colocated_ngo() {
        let candidates = vec![
            NgoCandidate::new("far").with_location(at(0.0, 1.0)),
            NgoCandidate::new("near").with_location(at(0.0, 0.0)),
        ];
        let assigned = nearest_assignment(&origin(), &candidates).unwrap();
        assert_eq!(assigned.id(), "near");
        assert!(assigned.distance_km.abs() < 1e-9);
        assert_eq!(assigned.rank, 0);
    }

    #[test]
    fn empty_input() {
        assert!(rank_candidates(&origin(), &[]).is_empty());
        assert!(nearest_assignment(&origin(), &[]).is_none());
    }

    #[test]
    fn no_usable_coordinates_means_no_assignment() {
        let candidates = vec![NgoCandidate::new("a"), NgoCandidate::new("b")];
        assert!(nearest_assignment(&origin(), &candidates).is_none());
        let outcome = GeoMatcher::default().match_report(&origin(), &candidates);
        assert!(outcome.assigned.is_none());
        assert!(outcome.nearby.is_empty());
        assert_eq!(outcome.ranked_count, 0);
    }

    #[test]
    fn no_radius_assigns_distant_ngo() {
        let candidates = vec![NgoCandidate::new("antipode").with_location(at(0.0, 180.0))];
        let assigned = GeoMatcher::default().nearest(&origin(), &candidates).unwrap();
        assert_eq!(assigned.id(), "antipode");
        assert!(assigned.distance_km > 20_000.0);
    }

    #[test]
    fn radius_drops_far_matches() {
        let candidates = vec![km_east("near", 10.0), km_east("mid", 40.0), km_east("far", 200.0)];
        let matcher = GeoMatcher::new(MatchConfig {
            top_k: 5,
            max_radius_km: Some(50.0),
        });
        let outcome = matcher.match_report(&origin(), &candidates);
        assert_eq!(outcome.assigned.map(|m| m.id()), Some("near"));
        assert_eq!(outcome.nearby.iter().map(|m| m.id()).collect::<Vec<_>>(), vec!["near", "mid"]);
        assert_eq!(outcome.ranked_count, 2);

        let tight = GeoMatcher::new(MatchConfig {
            top_k: 2,
            max_radius_km: Some(1.0),
        });
        assert!(tight.nearest(&origin(), &candidates).is_none());
    }

    #[test]
    fn invalid_radius_is_ignored() {
        for radius in [f64::NAN, f64::INFINITY, -1.0] {
            let config = MatchConfig {
                top_k: 2,
                max_radius_km: Some(radius),
            };
            assert_eq!(config.radius_km(), None);
        }
    }

    #[test]
    fn top_k_is_separate_from_assignment() {
        let candidates = vec![
            km_east("d", 4.0),
            km_east("a", 1.0),
            km_east("c", 3.0),
            km_east("b", 2.0),
        ];
        let outcome = GeoMatcher::default().match_report(&origin(), &candidates);
        assert_eq!(outcome.assigned.map(|m| m.id()), Some("a"));
        assert_eq!(outcome.nearby.iter().map(|m| m.id()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(outcome.ranked_count, 4);
    }

    #[test]
    fn summary_uses_persisted_field_names() {
        let candidates = vec![km_east("ngo-1", 1.0).with_name("River Rescue")];
        let summary = GeoMatcher::default().match_report(&origin(), &candidates).summary();
        assert_eq!(summary.assigned_ngo_id.as_deref(), Some("ngo-1"));

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["assignedNgoId"], "ngo-1");
        assert!(value["assignedNgoDistanceKm"].as_f64().unwrap() > 0.99);
        assert_eq!(value["nearbyNgos"][0]["name"], "River Rescue");
        assert_eq!(value["nearbyNgos"][0]["rank"], 0);
        assert!(value["nearbyNgos"][0]["distanceKm"].is_number());
    }

    #[test]
    fn empty_summary_serializes_nulls() {
        let summary = GeoMatcher::default().match_report(&origin(), &[]).summary();
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value["assignedNgoId"].is_null());
        assert!(value["assignedNgoDistanceKm"].is_null());
        assert_eq!(value["nearbyNgos"], json!([]));
    }
}
