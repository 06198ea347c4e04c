use thiserror::Error;

use tracemerge_core::ContourId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("match ({id1}, {id2}) is already stored")]
    DuplicateMatch { id1: ContourId, id2: ContourId },
    #[error("match ({id1}, {id2}) pairs a contour with itself")]
    SelfMatch { id1: ContourId, id2: ContourId },
    #[error("unknown contour id {id}")]
    UnknownContour { id: ContourId },
    #[error("contour {id} belongs to section {actual}, not section {expected}")]
    SectionMismatch { id: ContourId, expected: i32, actual: i32 },
    #[error("contour batch for section {expected} contains a contour of section {actual}")]
    BatchSectionMismatch { expected: i32, actual: i32 },
    #[error("section {0} has already been ingested")]
    SectionAlreadyIngested(i32),
    #[error("corrupt store: {0}")]
    Corrupt(String),
}
