use serde::{Deserialize, Serialize};

use tracemerge_core::{
    Contour, ContourId, ContourRef, Point, ReviewCategory, Series, SeriesId, ShapeKind,
};
use tracemerge_store::{EntityStore, StoredContour};

use crate::error::ReconError;
use crate::evidence::MatchSummary;
use crate::index::PairDiagnostic;

// ---------------------------------------------------------------------------
// Source lookup
// ---------------------------------------------------------------------------

/// Source contour at `loc`, if the series, section and index all exist.
pub fn locate(sources: &[Series], loc: ContourRef) -> Option<&Contour> {
    sources
        .get(loc.series.0 as usize)?
        .section(loc.section)?
        .contours
        .get(loc.index)
}

/// Resolve stored ids to their source contours. Fails with every id that
/// cannot be traced, ascending and deduplicated.
pub fn resolve_all<'s>(
    store: &dyn EntityStore,
    sources: &'s [Series],
    ids: impl IntoIterator<Item = ContourId>,
) -> Result<Vec<(StoredContour, &'s Contour)>, ReconError> {
    let mut resolved = Vec::new();
    let mut unresolved = Vec::new();
    for id in ids {
        match store.contour(id)? {
            Some(stored) => match locate(sources, stored.location) {
                Some(contour) => resolved.push((stored, contour)),
                None => unresolved.push(id),
            },
            None => unresolved.push(id),
        }
    }
    if unresolved.is_empty() {
        Ok(resolved)
    } else {
        unresolved.sort_unstable();
        unresolved.dedup();
        Err(ReconError::UnresolvedContours(unresolved))
    }
}

// ---------------------------------------------------------------------------
// Curation
// ---------------------------------------------------------------------------

/// One contour as shown to the curator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub contour_id: ContourId,
    pub series: SeriesId,
    pub name: String,
    pub kind: ShapeKind,
    /// Outline in section coordinates.
    pub coords: Vec<Point>,
    /// `[min_x, min_y, max_x, max_y]`.
    pub bounds: Option<[f64; 4]>,
    /// Default keep flag.
    pub keep: bool,
}

/// Review payload for one section. Each group lists its main contour first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionReview {
    pub section: i32,
    pub exact: Vec<Vec<ReviewEntry>>,
    pub potential: Vec<Vec<ReviewEntry>>,
    pub potential_realigned: Vec<Vec<ReviewEntry>>,
    pub unique: Vec<Vec<ReviewEntry>>,
}

impl SectionReview {
    pub fn groups(&self, category: ReviewCategory) -> &[Vec<ReviewEntry>] {
        match category {
            ReviewCategory::Exact => &self.exact,
            ReviewCategory::Potential => &self.potential,
            ReviewCategory::PotentialRealigned => &self.potential_realigned,
            ReviewCategory::Unique => &self.unique,
        }
    }

    pub(crate) fn groups_mut(&mut self, category: ReviewCategory) -> &mut Vec<Vec<ReviewEntry>> {
        match category {
            ReviewCategory::Exact => &mut self.exact,
            ReviewCategory::Potential => &mut self.potential,
            ReviewCategory::PotentialRealigned => &mut self.potential_realigned,
            ReviewCategory::Unique => &mut self.unique,
        }
    }
}

/// A curator's keep/discard choice for one contour in one review group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationDecision {
    pub contour_id: ContourId,
    pub category: ReviewCategory,
    pub keep: bool,
    /// New name for the merged copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed: Option<String>,
}

impl CurationDecision {
    pub fn keep(contour_id: ContourId, category: ReviewCategory) -> Self {
        Self { contour_id, category, keep: true, renamed: None }
    }

    pub fn discard(contour_id: ContourId, category: ReviewCategory) -> Self {
        Self { contour_id, category, keep: false, renamed: None }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.renamed = Some(name.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Distinct contours written to the merged series.
    pub kept: usize,
    /// Keep decisions for an id that was already kept.
    pub skipped_duplicates: usize,
    pub discarded: usize,
    pub sections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionMatchReport {
    pub section: i32,
    pub contours: usize,
    pub pairs_evaluated: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub diagnostics: Vec<PairDiagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRunReport {
    pub meta: RunMeta,
    pub summary: MatchSummary,
    pub sections: Vec<SectionMatchReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub series: Vec<String>,
    pub engine_version: String,
    pub run_at: String,
}
