use thiserror::Error;

use tracemerge_core::{ContourId, SeriesId};
use tracemerge_store::StoreError;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, incomplete category order, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Decision ids that could not be traced back to a source contour, ascending.
    #[error("{} unresolved contour id(s): {}", .0.len(), join_ids(.0))]
    UnresolvedContours(Vec<ContourId>),
    #[error("unknown series {0}")]
    UnknownSeries(SeriesId),
    /// A stored contour no longer exists in its source series.
    #[error("contour {id} not found in series {series}, section {section}, index {index}")]
    MissingContour { id: ContourId, series: SeriesId, section: i32, index: usize },
}

fn join_ids(ids: &[ContourId]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}
