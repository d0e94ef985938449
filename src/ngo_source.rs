//! Loading NGO candidates from CSV or from a JSON export of the account store.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use fnv::FnvHashSet;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::coerce::{finite_from_json, parse_finite_str, try_point_from_parts};
use crate::error::{CoordError, LoadError};
use crate::format::InputFormat;
use crate::geo::GeoPoint;
use crate::matcher::NgoCandidate;

pub(crate) const ID_COLUMNS: &[&str] = &["id", "_id", "ngo_id"];
const NAME_COLUMNS: &[&str] = &["name", "orgname", "org_name"];
const ADDRESS_COLUMNS: &[&str] = &["address", "location"];
pub(crate) const LAT_COLUMNS: &[&str] = &["lat", "latitude"];
pub(crate) const LON_COLUMNS: &[&str] = &["lng", "lon", "longitude"];

pub fn load_path(path: &Path, format: InputFormat) -> Result<Vec<NgoCandidate>, LoadError> {
    let reader = BufReader::new(File::open(path)?);
    let candidates = match format {
        InputFormat::Csv => read_csv(reader)?,
        InputFormat::Json => read_json(reader)?,
    };
    info!(
        path = %path.display(),
        candidates = candidates.len(),
        with_coordinates = candidates.iter().filter(|c| c.location.is_some()).count(),
        "Loaded NGO candidates"
    );
    Ok(candidates)
}

/// Finds the first header matching any of `names`, case-insensitively.
pub(crate) fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Turns coerced halves into a location, logging anything that was present but unusable.
pub(crate) fn resolve_location(
    id: &str,
    lat: Option<f64>,
    lon: Option<f64>,
    raw_present: bool,
) -> Option<GeoPoint> {
    match try_point_from_parts(lat, lon) {
        Ok(point) => Some(point),
        Err(CoordError::Missing) if !raw_present => {
            debug!(id = id, "No coordinates");
            None
        }
        Err(e) => {
            warn!(id = id, error = %e, "Ignoring malformed coordinates");
            None
        }
    }
}

struct CsvColumns {
    id: usize,
    name: Option<usize>,
    address: Option<usize>,
    lat: Option<usize>,
    lon: Option<usize>,
}

impl CsvColumns {
    fn locate(headers: &StringRecord) -> Result<Self, LoadError> {
        let id = find_column(headers, ID_COLUMNS).ok_or_else(|| LoadError::MissingColumn("id".to_string()))?;
        Ok(Self {
            id,
            name: find_column(headers, NAME_COLUMNS),
            address: find_column(headers, ADDRESS_COLUMNS),
            lat: find_column(headers, LAT_COLUMNS),
            lon: find_column(headers, LON_COLUMNS),
        })
    }
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<NgoCandidate>, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns = CsvColumns::locate(rdr.headers()?)?;

    let mut candidates = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let Some(id) = non_empty(record.get(columns.id)) else {
            warn!(line = record.position().map(|p| p.line()), "Skipping NGO row without id");
            continue;
        };
        let raw_lat = columns.lat.and_then(|i| record.get(i)).unwrap_or("");
        let raw_lon = columns.lon.and_then(|i| record.get(i)).unwrap_or("");
        let raw_present = !raw_lat.is_empty() || !raw_lon.is_empty();
        let location = resolve_location(&id, parse_finite_str(raw_lat), parse_finite_str(raw_lon), raw_present);

        candidates.push(NgoCandidate {
            name: non_empty(columns.name.and_then(|i| record.get(i))),
            address: non_empty(columns.address.and_then(|i| record.get(i))),
            id,
            location,
        });
    }

    warn_duplicates(&candidates);
    Ok(candidates)
}

/// Accepts a bare array of documents or an object carrying them under `items`.
pub(crate) fn document_array(root: Value) -> Result<Vec<Value>, LoadError> {
    match root {
        Value::Array(docs) => Ok(docs),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(docs)) => Ok(docs),
            _ => Err(LoadError::UnexpectedShape(
                "expected an array or an object with an 'items' array".to_string(),
            )),
        },
        other => Err(LoadError::UnexpectedShape(format!(
            "expected an array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Document id as a string: plain `_id`, extended-JSON `{"$oid": ...}`, or `id`.
pub(crate) fn document_id(doc: &Value) -> Option<String> {
    let raw = doc.get("_id").or_else(|| doc.get("id"))?;
    match raw {
        Value::String(s) => non_empty(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).and_then(|s| non_empty(Some(s))),
        _ => None,
    }
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn candidate_from_document(doc: &Value) -> Option<NgoCandidate> {
    if let Some(role) = doc.get("role").and_then(Value::as_str) {
        if role != "ngo" {
            return None;
        }
    }

    let Some(id) = document_id(doc) else {
        warn!("Skipping NGO document without id");
        return None;
    };

    let text = |key: &str| non_empty(doc.get(key).and_then(Value::as_str));

    let coords = match doc.get("locationCoords") {
        Some(nested) if is_present(Some(nested)) => nested,
        _ => doc,
    };
    let raw_present = is_present(coords.get("lat")) || is_present(coords.get("lng"));
    let location = resolve_location(
        &id,
        coords.get("lat").and_then(finite_from_json),
        coords.get("lng").and_then(finite_from_json),
        raw_present,
    );

    Some(NgoCandidate {
        name: text("orgName").or_else(|| text("name")),
        address: text("location"),
        id,
        location,
    })
}

pub fn read_json<R: Read>(reader: R) -> Result<Vec<NgoCandidate>, LoadError> {
    let root: Value = serde_json::from_reader(reader)?;
    let docs = document_array(root)?;
    let total = docs.len();

    let candidates: Vec<NgoCandidate> = docs.iter().filter_map(candidate_from_document).collect();
    debug!(documents = total, ngos = candidates.len(), "Read account documents");

    warn_duplicates(&candidates);
    Ok(candidates)
}

fn warn_duplicates(candidates: &[NgoCandidate]) {
    let mut seen: FnvHashSet<&str> = FnvHashSet::default();
    let mut reported: FnvHashSet<&str> = FnvHashSet::default();
    for candidate in candidates {
        let id = candidate.id.as_str();
        if !seen.insert(id) && reported.insert(id) {
            warn!(id = id, "Duplicate NGO id; keeping every record in input order");
        }
    }
}
