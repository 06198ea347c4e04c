//! `tracemerge-store`: entity store for ingested contours and match records.
//!
//! The engine only talks to [`EntityStore`]; [`MemoryStore`] backs tests and
//! one-shot runs, [`SqliteStore`] persists between CLI invocations.

pub mod error;
pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use tracemerge_core::{ContourId, ContourRef, MatchRecord, MatchType, SeriesId};

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// What to do with a match record whose `(id1, id2)` pair is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Skip it and count it in the [`InsertReport`].
    #[default]
    Ignore,
    /// Fail the whole batch.
    Reject,
}

/// A contour about to be ingested. The store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContour {
    pub location: ContourRef,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContour {
    pub id: ContourId,
    pub location: ContourRef,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InsertReport {
    pub inserted: usize,
    pub skipped_duplicates: usize,
}

/// Query/insert contract used by the matching engine.
///
/// Both insert operations are atomic: either the whole batch becomes visible
/// or nothing does. Stored rows are never updated or deleted.
pub trait EntityStore {
    fn duplicate_policy(&self) -> DuplicatePolicy;

    /// Ingest one section's contours. Ids are assigned ascending in batch
    /// order. A section can be ingested once, even with an empty batch.
    fn insert_contours(
        &mut self,
        section: i32,
        batch: &[NewContour],
    ) -> Result<Vec<StoredContour>, StoreError>;

    /// Append one section's match records.
    fn insert_matches(
        &mut self,
        section: i32,
        records: &[MatchRecord],
    ) -> Result<InsertReport, StoreError>;

    fn contour(&self, id: ContourId) -> Result<Option<StoredContour>, StoreError>;

    /// Contours of a section, id ascending.
    fn contours_in_section(&self, section: i32) -> Result<Vec<StoredContour>, StoreError>;

    /// Contours of a series, id ascending.
    fn contours_in_series(&self, series: SeriesId) -> Result<Vec<StoredContour>, StoreError>;

    /// Match records of a section, ordered by `(id1, id2)`.
    fn matches_in_section(&self, section: i32) -> Result<Vec<MatchRecord>, StoreError>;

    /// All match records, optionally of one type, ordered by `(id1, id2)`.
    fn matches(&self, match_type: Option<MatchType>) -> Result<Vec<MatchRecord>, StoreError>;

    /// Ingested section indexes, ascending. Empty sections are included.
    fn sections(&self) -> Result<Vec<i32>, StoreError>;
}

/// Reject a contour batch that strays outside its section.
pub(crate) fn check_contour_batch(section: i32, batch: &[NewContour]) -> Result<(), StoreError> {
    for c in batch {
        if c.location.section != section {
            return Err(StoreError::BatchSectionMismatch {
                expected: section,
                actual: c.location.section,
            });
        }
    }
    Ok(())
}
