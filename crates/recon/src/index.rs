use rayon::prelude::*;
use serde::Serialize;

use tracemerge_core::{Contour, ContourId, GeometryProvider, MatchRecord};
use tracemerge_store::{EntityStore, InsertReport};

use crate::classify::{classify_candidates, Candidate};
use crate::error::ReconError;

/// A stored contour of one section, paired with its source geometry.
#[derive(Debug, Clone, Copy)]
pub struct SectionContour<'a> {
    pub id: ContourId,
    pub contour: &'a Contour,
}

/// A contour pair the classifier could not evaluate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDiagnostic {
    pub section: i32,
    pub id1: ContourId,
    pub id2: ContourId,
    pub message: String,
}

/// Result of one section's pairwise scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBatch {
    pub section: i32,
    /// Match edges in scan order.
    pub records: Vec<MatchRecord>,
    pub diagnostics: Vec<PairDiagnostic>,
    pub pairs_evaluated: usize,
}

enum PairOutcome {
    Match(MatchRecord),
    Failed(PairDiagnostic),
}

/// Classify every unordered pair `(i, j)`, `i < j`, of `contours` exactly once.
///
/// Records carry `id1 = contours[i].id`, `id2 = contours[j].id`. The parallel
/// run yields the same batch, in the same order, as the sequential one.
pub fn build_matches(
    section: i32,
    contours: &[SectionContour<'_>],
    geometry: &dyn GeometryProvider,
    parallel: bool,
) -> MatchBatch {
    let candidates: Vec<(ContourId, Candidate<'_>)> =
        contours.iter().map(|c| (c.id, Candidate::new(c.contour))).collect();
    let n = candidates.len();

    let row = |i: usize| -> (usize, Vec<PairOutcome>) {
        let (id1, a) = &candidates[i];
        let rest = &candidates[i + 1..];
        let outcomes: Vec<PairOutcome> = rest
            .iter()
            .filter_map(|(id2, b)| match classify_candidates(a, b, geometry) {
                Ok(Some(match_type)) => Some(PairOutcome::Match(MatchRecord::new(*id1, *id2, match_type))),
                Ok(None) => None,
                Err(e) => Some(PairOutcome::Failed(PairDiagnostic {
                    section,
                    id1: *id1,
                    id2: *id2,
                    message: e.to_string(),
                })),
            })
            .collect();
        (rest.len(), outcomes)
    };

    let rows: Vec<(usize, Vec<PairOutcome>)> = if parallel {
        (0..n).into_par_iter().map(row).collect()
    } else {
        (0..n).map(row).collect()
    };

    let mut records = Vec::new();
    let mut diagnostics = Vec::new();
    let mut pairs_evaluated = 0;
    for (evaluated, outcomes) in rows {
        pairs_evaluated += evaluated;
        for outcome in outcomes {
            match outcome {
                PairOutcome::Match(r) => records.push(r),
                PairOutcome::Failed(d) => {
                    tracing::warn!(section, id1 = d.id1, id2 = d.id2, "skipping malformed pair: {}", d.message);
                    diagnostics.push(d);
                }
            }
        }
    }

    MatchBatch { section, records, diagnostics, pairs_evaluated }
}

/// Persist a batch as one atomic insert.
pub fn insert_batch(
    store: &mut dyn EntityStore,
    batch: &MatchBatch,
) -> Result<InsertReport, ReconError> {
    let report = store.insert_matches(batch.section, &batch.records)?;
    if report.skipped_duplicates > 0 {
        tracing::warn!(
            section = batch.section,
            skipped = report.skipped_duplicates,
            "duplicate match records skipped"
        );
    }
    tracing::debug!(section = batch.section, inserted = report.inserted, "match batch stored");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;
    use tracemerge_core::{GeometryError, MatchType, PlanarGeometry, Point, Shape, Transform};

    /// Records every pair it is asked about, keyed by each shape's first x.
    #[derive(Default)]
    struct CountingGeometry {
        calls: Mutex<Vec<(i64, i64)>>,
    }

    impl GeometryProvider for CountingGeometry {
        fn contacts(&self, a: &Shape, b: &Shape) -> Result<bool, GeometryError> {
            let (ka, kb) = (a.coords()[0].x as i64, b.coords()[0].x as i64);
            self.calls.lock().unwrap().push((ka.min(kb), ka.max(kb)));
            Ok(false)
        }

        fn overlap_ratio(&self, _: &Shape, _: &Shape) -> Result<f64, GeometryError> {
            Ok(0.0)
        }

        fn is_exact_duplicate(&self, _: &Shape, _: &Shape) -> Result<bool, GeometryError> {
            Ok(false)
        }

        fn is_potential_duplicate(&self, _: &Shape, _: &Shape) -> Result<bool, GeometryError> {
            Ok(false)
        }
    }

    fn square(name: &str, x: f64, size: f64) -> Contour {
        Contour::new(
            name,
            vec![
                Point::new(x, 0.0),
                Point::new(x + size, 0.0),
                Point::new(x + size, size),
                Point::new(x, size),
            ],
            Transform::identity(),
        )
    }

    fn section(contours: &[Contour]) -> Vec<SectionContour<'_>> {
        contours
            .iter()
            .enumerate()
            .map(|(i, contour)| SectionContour { id: i as ContourId + 1, contour })
            .collect()
    }

    #[test]
    fn empty_and_single_sections_evaluate_nothing() {
        let g = PlanarGeometry::default();
        let batch = build_matches(1, &[], &g, false);
        assert_eq!(batch.pairs_evaluated, 0);
        let one = [square("a", 0.0, 1.0)];
        let batch = build_matches(1, &section(&one), &g, true);
        assert_eq!(batch.pairs_evaluated, 0);
        assert!(batch.records.is_empty());
    }

    #[test]
    fn records_follow_scan_order() {
        let contours = [
            square("mito1", 0.0, 10.0),
            square("mito1", 0.0, 10.0),
            square("mito1", 0.0, 10.0),
            square("nuc", 0.0, 10.0),
        ];
        let batch = build_matches(3, &section(&contours), &PlanarGeometry::default(), false);
        assert_eq!(batch.pairs_evaluated, 6);
        assert_eq!(
            batch.records,
            vec![
                MatchRecord::new(1, 2, MatchType::Exact),
                MatchRecord::new(1, 3, MatchType::Exact),
                MatchRecord::new(2, 3, MatchType::Exact),
            ]
        );
    }

    #[test]
    fn every_unordered_pair_reaches_geometry_once() {
        let contours: Vec<Contour> = (0..7).map(|i| square("mito1", i as f64 * 10.0, 4.0)).collect();
        let n = contours.len();
        for parallel in [false, true] {
            let geometry = CountingGeometry::default();
            let batch = build_matches(2, &section(&contours), &geometry, parallel);
            let calls = geometry.calls.into_inner().unwrap();

            assert_eq!(calls.len(), n * (n - 1) / 2);
            assert_eq!(batch.pairs_evaluated, calls.len());
            let distinct: BTreeSet<_> = calls.iter().copied().collect();
            assert_eq!(distinct.len(), calls.len());
            assert!(calls.iter().all(|(a, b)| a < b));
            assert!(batch.records.is_empty());
        }
    }

    #[test]
    fn malformed_pair_becomes_diagnostic() {
        let mut broken = square("mito1", 0.0, 10.0);
        broken.points.truncate(2);
        let contours = [square("mito1", 0.0, 10.0), broken, square("mito1", 0.0, 10.0)];
        let batch = build_matches(7, &section(&contours), &PlanarGeometry::default(), true);

        assert_eq!(batch.pairs_evaluated, 3);
        assert_eq!(batch.records, vec![MatchRecord::new(1, 3, MatchType::Exact)]);
        assert_eq!(batch.diagnostics.len(), 2);
        assert_eq!((batch.diagnostics[0].id1, batch.diagnostics[0].id2), (1, 2));
        assert_eq!((batch.diagnostics[1].id1, batch.diagnostics[1].id2), (2, 3));
        assert!(batch.diagnostics.iter().all(|d| d.section == 7));
    }
}
