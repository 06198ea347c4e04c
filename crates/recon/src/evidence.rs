use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::SectionMatchReport;

/// Totals over a matching run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchSummary {
    pub sections: usize,
    pub contours: usize,
    pub pairs_evaluated: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub diagnostics: usize,
    /// Sections that produced at least one diagnostic, with their counts.
    pub sections_with_diagnostics: BTreeMap<i32, usize>,
}

/// Compute summary statistics from per-section reports.
pub fn compute_summary(reports: &[SectionMatchReport]) -> MatchSummary {
    let mut summary = MatchSummary { sections: reports.len(), ..Default::default() };
    for r in reports {
        summary.contours += r.contours;
        summary.pairs_evaluated += r.pairs_evaluated;
        summary.inserted += r.inserted;
        summary.skipped_duplicates += r.skipped_duplicates;
        summary.diagnostics += r.diagnostics.len();
        if !r.diagnostics.is_empty() {
            summary.sections_with_diagnostics.insert(r.section, r.diagnostics.len());
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PairDiagnostic;

    fn report(section: i32, contours: usize, inserted: usize, diagnostics: usize) -> SectionMatchReport {
        SectionMatchReport {
            section,
            contours,
            pairs_evaluated: contours * contours.saturating_sub(1) / 2,
            inserted,
            skipped_duplicates: 0,
            diagnostics: (0..diagnostics)
                .map(|i| PairDiagnostic {
                    section,
                    id1: i as i64,
                    id2: i as i64 + 1,
                    message: "zero area".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn summary_counts() {
        let summary = compute_summary(&[report(1, 3, 1, 0), report(2, 4, 2, 2), report(5, 0, 0, 0)]);
        assert_eq!(summary.sections, 3);
        assert_eq!(summary.contours, 7);
        assert_eq!(summary.pairs_evaluated, 9);
        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.diagnostics, 2);
        assert_eq!(summary.sections_with_diagnostics.into_iter().collect::<Vec<_>>(), vec![(2, 2)]);
    }
}
