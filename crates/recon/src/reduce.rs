use std::collections::{BTreeMap, HashMap, HashSet};

use tracemerge_core::{Contour, ContourId, ContourRef, ReviewCategory, Section, Series, SeriesId};
use tracemerge_store::EntityStore;

use crate::error::ReconError;
use crate::model::{resolve_all, CurationDecision, MergeReport};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates kept contours into a fresh Series. Never touches the sources.
#[derive(Debug)]
pub struct MergedSeriesBuilder {
    name: String,
    index: i32,
    units: String,
    sections: BTreeMap<i32, MergedSection>,
}

#[derive(Debug)]
struct MergedSection {
    skeleton: Section,
    contours: BTreeMap<(SeriesId, usize), Contour>,
}

impl MergedSeriesBuilder {
    /// Metadata and section layout of `base`, no contours.
    pub fn from_base(base: &Series) -> Self {
        let sections = base
            .sections
            .iter()
            .map(|s| (s.index, MergedSection { skeleton: s.skeleton(), contours: BTreeMap::new() }))
            .collect();
        Self { name: base.name.clone(), index: base.index, units: base.units.clone(), sections }
    }

    /// Add a contour at its source position. Sections unknown to the base
    /// are created from `source_section`'s metadata.
    pub fn add(&mut self, location: ContourRef, source_section: &Section, contour: Contour) {
        self.sections
            .entry(location.section)
            .or_insert_with(|| MergedSection {
                skeleton: source_section.skeleton(),
                contours: BTreeMap::new(),
            })
            .contours
            .insert((location.series, location.index), contour);
    }

    pub fn build(self) -> Series {
        Series {
            name: self.name,
            index: self.index,
            units: self.units,
            sections: self
                .sections
                .into_values()
                .map(|s| Section { contours: s.contours.into_values().collect(), ..s.skeleton })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reduce
// ---------------------------------------------------------------------------

/// Turn curation decisions into one merged Series.
///
/// Every decision id must resolve to a source contour before anything is
/// built. Decisions are then visited category by category in
/// `category_order`, ids ascending within a category; the first keep of an
/// id wins and later keeps of the same id are skipped.
pub fn reduce(
    store: &dyn EntityStore,
    sources: &[Series],
    base: SeriesId,
    decisions: &[CurationDecision],
    category_order: &[ReviewCategory],
) -> Result<(Series, MergeReport), ReconError> {
    let base_series = sources.get(base.0 as usize).ok_or(ReconError::UnknownSeries(base))?;

    let resolved: HashMap<ContourId, (ContourRef, &Contour)> =
        resolve_all(store, sources, decisions.iter().map(|d| d.contour_id))?
            .into_iter()
            .map(|(stored, contour)| (stored.id, (stored.location, contour)))
            .collect();

    let rank = |category: ReviewCategory| {
        category_order.iter().position(|c| *c == category).unwrap_or(category_order.len())
    };
    let mut ordered: Vec<&CurationDecision> = decisions.iter().collect();
    ordered.sort_by_key(|d| (rank(d.category), d.contour_id));

    let mut builder = MergedSeriesBuilder::from_base(base_series);
    let mut kept: HashSet<ContourId> = HashSet::new();
    let mut report = MergeReport::default();

    for decision in ordered {
        if !decision.keep {
            report.discarded += 1;
            continue;
        }
        if !kept.insert(decision.contour_id) {
            report.skipped_duplicates += 1;
            continue;
        }
        let Some(&(location, contour)) = resolved.get(&decision.contour_id) else {
            return Err(ReconError::UnresolvedContours(vec![decision.contour_id]));
        };
        let source_section = sources
            .get(location.series.0 as usize)
            .and_then(|s| s.section(location.section))
            .ok_or(ReconError::MissingContour {
                id: decision.contour_id,
                series: location.series,
                section: location.section,
                index: location.index,
            })?;
        let merged = match &decision.renamed {
            Some(name) => contour.renamed(name),
            None => contour.clone(),
        };
        builder.add(location, source_section, merged);
        report.kept += 1;
    }

    let series = builder.build();
    report.sections = series.sections.len();
    tracing::info!(
        kept = report.kept,
        skipped = report.skipped_duplicates,
        discarded = report.discarded,
        "merged series built"
    );
    Ok((series, report))
}
