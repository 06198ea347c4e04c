use std::collections::HashMap;

use tracemerge_core::{Contour, ContourId, MatchType, ReviewCategory, Series};
use tracemerge_store::{EntityStore, StoredContour};

use crate::error::ReconError;
use crate::group::{group_by_section, unique_ids};
use crate::model::{resolve_all, CurationDecision, ReviewEntry, SectionReview};

/// Default keep flag for a matched (non-main) member of a group.
fn member_keeps(match_type: MatchType) -> bool {
    match match_type {
        MatchType::Exact => false,
        MatchType::Potential | MatchType::PotentialRealigned => true,
    }
}

fn entry(stored: &StoredContour, contour: &Contour, keep: bool) -> ReviewEntry {
    let shape = contour.shape();
    ReviewEntry {
        contour_id: stored.id,
        series: stored.location.series,
        name: contour.name.clone(),
        kind: shape.kind(),
        bounds: shape.bounds(),
        coords: shape.coords().to_vec(),
        keep,
    }
}

/// Build the review payload for one section.
///
/// One group per `(id1, match type)`: the `id1` contour first with
/// `keep = true`, then its matches ascending. One single-entry group per
/// unique contour.
pub fn build_review(
    store: &dyn EntityStore,
    sources: &[Series],
    section: i32,
) -> Result<SectionReview, ReconError> {
    let groups = group_by_section(store, section)?;
    let section_ids: Vec<ContourId> =
        store.contours_in_section(section)?.into_iter().map(|c| c.id).collect();
    let uniques = unique_ids(section_ids.iter().copied(), &store.matches_in_section(section)?);

    let resolved: HashMap<ContourId, (StoredContour, &Contour)> =
        resolve_all(store, sources, section_ids)?
            .into_iter()
            .map(|(stored, contour)| (stored.id, (stored, contour)))
            .collect();
    let lookup = |id: ContourId| {
        resolved
            .get(&id)
            .ok_or_else(|| ReconError::UnresolvedContours(vec![id]))
    };

    let mut review = SectionReview { section, ..Default::default() };

    for (id1, by_type) in &groups {
        for (match_type, members) in by_type {
            let (stored, contour) = lookup(*id1)?;
            let mut entries = vec![entry(stored, contour, true)];
            for id2 in members {
                let (stored, contour) = lookup(*id2)?;
                entries.push(entry(stored, contour, member_keeps(*match_type)));
            }
            review.groups_mut(ReviewCategory::from(*match_type)).push(entries);
        }
    }

    for id in &uniques {
        let (stored, contour) = lookup(*id)?;
        review.unique.push(vec![entry(stored, contour, true)]);
    }

    tracing::debug!(
        section,
        exact = review.exact.len(),
        potential = review.potential.len(),
        realigned = review.potential_realigned.len(),
        unique = review.unique.len(),
        "built review payload"
    );
    Ok(review)
}

/// Decisions of a curator who accepts every default.
pub fn default_decisions(review: &SectionReview) -> Vec<CurationDecision> {
    ReviewCategory::DEFAULT_ORDER
        .iter()
        .flat_map(|&category| {
            review.groups(category).iter().flatten().map(move |e| CurationDecision {
                contour_id: e.contour_id,
                category,
                keep: e.keep,
                renamed: None,
            })
        })
        .collect()
}
