use std::collections::{BTreeMap, BTreeSet};

use tracemerge_core::{ContourId, MatchRecord, MatchType};
use tracemerge_store::EntityStore;

use crate::error::ReconError;

/// `id1 -> match type -> matched ids`, every level ascending.
pub type MatchGroups = BTreeMap<ContourId, BTreeMap<MatchType, BTreeSet<ContourId>>>;

/// Group edges under their `id1`. An edge never appears under its `id2`, so
/// only ids that opened at least one edge get a key.
pub fn group_matches(records: &[MatchRecord]) -> MatchGroups {
    let mut groups = MatchGroups::new();
    for r in records {
        groups
            .entry(r.id1)
            .or_default()
            .entry(r.match_type)
            .or_default()
            .insert(r.id2);
    }
    groups
}

/// Ids from `ids` that appear on neither side of any edge.
pub fn unique_ids(
    ids: impl IntoIterator<Item = ContourId>,
    records: &[MatchRecord],
) -> BTreeSet<ContourId> {
    let matched: BTreeSet<ContourId> = records.iter().flat_map(|r| [r.id1, r.id2]).collect();
    ids.into_iter().filter(|id| !matched.contains(id)).collect()
}

pub fn group_by_section(store: &dyn EntityStore, section: i32) -> Result<MatchGroups, ReconError> {
    Ok(group_matches(&store.matches_in_section(section)?))
}

pub fn compute_uniques(
    store: &dyn EntityStore,
    section: i32,
) -> Result<BTreeSet<ContourId>, ReconError> {
    let ids = store.contours_in_section(section)?.into_iter().map(|c| c.id);
    Ok(unique_ids(ids, &store.matches_in_section(section)?))
}
