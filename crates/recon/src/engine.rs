use std::collections::BTreeSet;

use tracemerge_core::{ContourRef, GeometryProvider, Series, SeriesId};
use tracemerge_store::{EntityStore, NewContour, StoredContour};

use crate::config::MergeConfig;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::index::{build_matches, insert_batch, SectionContour};
use crate::model::{resolve_all, MatchRunReport, RunMeta, SectionMatchReport};

/// Every section index present in any series, ascending.
pub fn section_indexes(sources: &[Series]) -> Vec<i32> {
    sources
        .iter()
        .flat_map(|s| s.sections.iter().map(|sec| sec.index))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Store one section's contours across all series as one batch, series
/// order then position.
pub fn ingest_section(
    store: &mut dyn EntityStore,
    sources: &[Series],
    section: i32,
) -> Result<Vec<StoredContour>, ReconError> {
    let batch: Vec<NewContour> = sources
        .iter()
        .enumerate()
        .filter_map(|(s, series)| Some((s, series.section(section)?)))
        .flat_map(|(s, sec)| {
            sec.contours.iter().enumerate().map(move |(index, c)| NewContour {
                location: ContourRef { series: SeriesId(s as u32), section, index },
                name: c.name.clone(),
            })
        })
        .collect();
    Ok(store.insert_contours(section, &batch)?)
}

/// Classify every contour pair of an ingested section and store the edges.
pub fn match_section(
    store: &mut dyn EntityStore,
    sources: &[Series],
    section: i32,
    config: &MergeConfig,
    geometry: &dyn GeometryProvider,
) -> Result<SectionMatchReport, ReconError> {
    let ids = store.contours_in_section(section)?.into_iter().map(|c| c.id);
    let resolved = resolve_all(&*store, sources, ids)?;
    let contours: Vec<SectionContour<'_>> = resolved
        .iter()
        .map(|(stored, contour)| SectionContour { id: stored.id, contour: *contour })
        .collect();

    let batch = build_matches(section, &contours, geometry, config.matching.parallel);
    let inserted = insert_batch(store, &batch)?;

    tracing::info!(
        section,
        contours = contours.len(),
        matches = inserted.inserted,
        diagnostics = batch.diagnostics.len(),
        "section matched"
    );

    Ok(SectionMatchReport {
        section,
        contours: contours.len(),
        pairs_evaluated: batch.pairs_evaluated,
        inserted: inserted.inserted,
        skipped_duplicates: inserted.skipped_duplicates,
        diagnostics: batch.diagnostics,
    })
}

/// Ingest and match every section of `sources`, ascending.
///
/// Sections already in the store are not ingested again; their matches are
/// recomputed and inserted under the store's duplicate policy.
pub fn run_matching(
    store: &mut dyn EntityStore,
    sources: &[Series],
    config: &MergeConfig,
    geometry: &dyn GeometryProvider,
) -> Result<MatchRunReport, ReconError> {
    let ingested: BTreeSet<i32> = store.sections()?.into_iter().collect();
    let mut reports = Vec::new();

    for section in section_indexes(sources) {
        if ingested.contains(&section) {
            tracing::debug!(section, "section already ingested");
        } else {
            ingest_section(store, sources, section)?;
        }
        reports.push(match_section(store, sources, section, config, geometry)?);
    }

    Ok(MatchRunReport {
        meta: RunMeta {
            series: sources.iter().map(|s| s.name.clone()).collect(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: compute_summary(&reports),
        sections: reports,
    })
}
