//! Nearest-NGO matching for wildlife incident reports.
//!
//! Given a report's coordinates and the registered NGOs, rank the NGOs by
//! great-circle distance and pick the nearest one for assignment. Bad
//! location data never fails a request; it only shrinks the candidate set.

pub mod coerce;
pub mod error;
pub mod format;
pub mod geo;
pub mod matcher;
pub mod ngo_source;
pub mod reports;
pub mod telemetry;

pub use error::{CoordError, LoadError};
pub use format::InputFormat;
pub use geo::{compute_distance_km, haversine_km, GeoPoint};
pub use matcher::{
    nearest_assignment, rank_candidates, GeoMatcher, MatchConfig, MatchOutcome, MatchSummary, NearbyNgo,
    NgoCandidate, RankedMatch,
};
