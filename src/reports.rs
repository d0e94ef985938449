//! Batch assignment of submitted reports to their nearest NGO.
//!
//! A report whose own coordinates are unusable is passed through untouched
//! apart from empty assignment fields; the batch never fails on bad data.

use std::fmt;
use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use fnv::FnvHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::coerce::{parse_finite_str, point_from_parts, report_point};
use crate::error::LoadError;
use crate::geo::GeoPoint;
use crate::matcher::{GeoMatcher, MatchSummary, NgoCandidate};
use crate::ngo_source::{document_array, document_id, find_column, non_empty, ID_COLUMNS, LAT_COLUMNS, LON_COLUMNS};

pub const ASSIGNED_ID_FIELD: &str = "assignedNgoId";
pub const ASSIGNED_DISTANCE_FIELD: &str = "assignedNgoDistanceKm";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchStats {
    pub reports: usize,
    pub assigned: usize,
    /// Reports whose own coordinates were missing or malformed.
    pub invalid_source: usize,
    /// Reports with a valid location but no NGO in range.
    pub unassigned: usize,
    pub per_ngo: FnvHashMap<String, usize>,
}

impl BatchStats {
    fn record(&mut self, summary: Option<&MatchSummary>) {
        self.reports += 1;
        match summary {
            None => self.invalid_source += 1,
            Some(MatchSummary {
                assigned_ngo_id: Some(id),
                ..
            }) => {
                self.assigned += 1;
                *self.per_ngo.entry(id.clone()).or_insert(0) += 1;
            }
            Some(_) => self.unassigned += 1,
        }
    }

    /// Per-NGO assignment counts, busiest first, ties by id.
    pub fn tallies(&self) -> Vec<(&str, usize)> {
        let mut tallies: Vec<(&str, usize)> = self.per_ngo.iter().map(|(id, n)| (id.as_str(), *n)).collect();
        tallies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tallies
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reports: {}", self.reports)?;
        writeln!(f, "Assigned: {}", self.assigned)?;
        writeln!(f, "Skipped (invalid report coordinates): {}", self.invalid_source)?;
        writeln!(f, "Unassigned (no NGO in range): {}", self.unassigned)?;
        for (id, count) in self.tallies() {
            writeln!(f, "  {}: {}", id, count)?;
        }
        Ok(())
    }
}

/// Matches one report, or `None` when its location is unusable.
fn assign_one(
    report_id: Option<&str>,
    source: Option<GeoPoint>,
    matcher: &GeoMatcher,
    candidates: &[NgoCandidate],
) -> Option<MatchSummary> {
    let Some(source) = source else {
        warn!(report_id = report_id, "Skipping geo-assignment: invalid report coordinates");
        return None;
    };
    let summary = matcher.match_report(&source, candidates).summary();
    debug!(
        report_id = report_id,
        assigned = summary.assigned_ngo_id.as_deref(),
        distance_km = summary.assigned_ngo_distance_km,
        "Matched report"
    );
    Some(summary)
}

/// Reads reports as CSV and writes them back with the assignment columns appended.
pub fn assign_csv<R: Read, W: Write>(
    reader: R,
    writer: W,
    matcher: &GeoMatcher,
    candidates: &[NgoCandidate],
) -> Result<BatchStats, LoadError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);

    let headers = rdr.headers()?.clone();
    let id_col = find_column(&headers, ID_COLUMNS);
    let lat_col = find_column(&headers, LAT_COLUMNS).ok_or_else(|| LoadError::MissingColumn("latitude".to_string()))?;
    let lon_col = find_column(&headers, LON_COLUMNS).ok_or_else(|| LoadError::MissingColumn("longitude".to_string()))?;

    let mut out_headers = headers.clone();
    out_headers.push_field(ASSIGNED_ID_FIELD);
    out_headers.push_field(ASSIGNED_DISTANCE_FIELD);
    wtr.write_record(&out_headers)?;

    let mut stats = BatchStats::default();
    let mut row = StringRecord::new();
    while rdr.read_record(&mut row)? {
        let report_id = id_col.and_then(|i| non_empty(row.get(i)));
        let source = point_from_parts(
            row.get(lat_col).and_then(parse_finite_str),
            row.get(lon_col).and_then(parse_finite_str),
        );
        let summary = assign_one(report_id.as_deref(), source, matcher, candidates);
        stats.record(summary.as_ref());

        let mut out = row.clone();
        match summary.as_ref().and_then(|s| s.assigned_ngo_id.as_deref().zip(s.assigned_ngo_distance_km)) {
            Some((id, distance)) => {
                out.push_field(id);
                out.push_field(&format!("{:.6}", distance));
            }
            None => {
                out.push_field("");
                out.push_field("");
            }
        }
        wtr.write_record(&out)?;
    }
    wtr.flush()?;
    Ok(stats)
}

fn source_of(doc: &Value) -> Option<GeoPoint> {
    doc.get("coordinates")
        .and_then(report_point)
        .or_else(|| report_point(doc))
}

/// Reads report documents and returns them with the assignment fields merged in.
pub fn assign_json<R: Read>(
    reader: R,
    matcher: &GeoMatcher,
    candidates: &[NgoCandidate],
) -> Result<(Vec<Value>, BatchStats), LoadError> {
    let root: Value = serde_json::from_reader(reader)?;
    let mut docs = document_array(root)?;

    let mut stats = BatchStats::default();
    for doc in docs.iter_mut() {
        let report_id = document_id(doc);
        let summary = assign_one(report_id.as_deref(), source_of(doc), matcher, candidates);
        stats.record(summary.as_ref());

        let fields = serde_json::to_value(summary.unwrap_or_default())?;
        if let (Value::Object(map), Value::Object(fields)) = (doc, fields) {
            map.extend(fields);
        }
    }
    Ok((docs, stats))
}
