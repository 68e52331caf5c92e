// Error types for the point cloud overlay
//
// Load failures never escape the overlay as panics: they are returned from the
// internal load path and then reported to subscribers through `loaderror`.

use thiserror::Error;

pub type OverlayResult<T> = Result<T, OverlayError>;

/// The payload or its field layout cannot describe a point cloud.
#[derive(Error, Debug)]
pub enum DataFormatError {
    #[error("points_format is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("payload has no `points` buffer")]
    MissingPoints,

    #[error("points_format is empty")]
    EmptyFormat,

    #[error("buffer length {len} is not a multiple of the field count {field_count}")]
    RaggedBuffer { len: usize, field_count: usize },

    #[error("dataset holds {count} records, more than a particle index can address")]
    TooManyRecords { count: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport-level failure while probing or downloading a dataset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} not found")]
    NotFound { url: String },

    #[error("no point cloud available ({tried} candidate urls tried)")]
    NoCandidate { tried: usize },
}

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("data format error: {0}")]
    DataFormat(#[from] DataFormatError),
}

impl From<serde_json::Error> for OverlayError {
    fn from(e: serde_json::Error) -> Self {
        Self::DataFormat(DataFormatError::Json(e))
    }
}
