use thiserror::Error;

/// Why a coordinate pair could not become a `GeoPoint`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordError {
    #[error("coordinates missing")]
    Missing,

    #[error("coordinates not finite: ({lat}, {lon})")]
    NonFinite { lat: f64, lon: f64 },

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("unexpected document shape: {0}")]
    UnexpectedShape(String),
}
