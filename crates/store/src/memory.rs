use std::collections::{BTreeMap, BTreeSet};

use tracemerge_core::{ContourId, MatchRecord, MatchType, SeriesId};

use crate::{
    check_contour_batch, DuplicatePolicy, EntityStore, InsertReport, NewContour, StoreError,
    StoredContour,
};

/// In-process store. Batches are validated in full before anything is
/// applied, so a failed insert leaves the store untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policy: DuplicatePolicy,
    next_id: ContourId,
    contours: BTreeMap<ContourId, StoredContour>,
    by_section: BTreeMap<i32, Vec<ContourId>>,
    matches: BTreeMap<(ContourId, ContourId), MatchType>,
    matches_by_section: BTreeMap<i32, BTreeSet<(ContourId, ContourId)>>,
}

impl MemoryStore {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy, next_id: 1, ..Default::default() }
    }

    fn section_of(&self, id: ContourId) -> Result<i32, StoreError> {
        self.contours
            .get(&id)
            .map(|c| c.location.section)
            .ok_or(StoreError::UnknownContour { id })
    }
}

impl EntityStore for MemoryStore {
    fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn insert_contours(
        &mut self,
        section: i32,
        batch: &[NewContour],
    ) -> Result<Vec<StoredContour>, StoreError> {
        check_contour_batch(section, batch)?;
        if self.by_section.contains_key(&section) {
            return Err(StoreError::SectionAlreadyIngested(section));
        }

        let first = self.next_id.max(1);
        let stored: Vec<StoredContour> = batch
            .iter()
            .zip(first..)
            .map(|(c, id)| StoredContour { id, location: c.location, name: c.name.clone() })
            .collect();

        self.next_id = first + stored.len() as ContourId;
        self.by_section.insert(section, stored.iter().map(|c| c.id).collect());
        for c in &stored {
            self.contours.insert(c.id, c.clone());
        }
        Ok(stored)
    }

    fn insert_matches(
        &mut self,
        section: i32,
        records: &[MatchRecord],
    ) -> Result<InsertReport, StoreError> {
        let mut accepted: Vec<MatchRecord> = Vec::with_capacity(records.len());
        let mut seen: BTreeSet<(ContourId, ContourId)> = BTreeSet::new();
        let mut report = InsertReport::default();

        for r in records {
            if r.id1 == r.id2 {
                return Err(StoreError::SelfMatch { id1: r.id1, id2: r.id2 });
            }
            for id in [r.id1, r.id2] {
                let actual = self.section_of(id)?;
                if actual != section {
                    return Err(StoreError::SectionMismatch { id, expected: section, actual });
                }
            }
            let key = (r.id1, r.id2);
            if self.matches.contains_key(&key) || !seen.insert(key) {
                match self.policy {
                    DuplicatePolicy::Reject => {
                        return Err(StoreError::DuplicateMatch { id1: r.id1, id2: r.id2 })
                    }
                    DuplicatePolicy::Ignore => {
                        report.skipped_duplicates += 1;
                        continue;
                    }
                }
            }
            accepted.push(*r);
        }

        let section_set = self.matches_by_section.entry(section).or_default();
        for r in &accepted {
            self.matches.insert((r.id1, r.id2), r.match_type);
            section_set.insert((r.id1, r.id2));
        }
        report.inserted = accepted.len();
        Ok(report)
    }

    fn contour(&self, id: ContourId) -> Result<Option<StoredContour>, StoreError> {
        Ok(self.contours.get(&id).cloned())
    }

    fn contours_in_section(&self, section: i32) -> Result<Vec<StoredContour>, StoreError> {
        Ok(self
            .by_section
            .get(&section)
            .map(|ids| ids.iter().filter_map(|id| self.contours.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn contours_in_series(&self, series: SeriesId) -> Result<Vec<StoredContour>, StoreError> {
        Ok(self
            .contours
            .values()
            .filter(|c| c.location.series == series)
            .cloned()
            .collect())
    }

    fn matches_in_section(&self, section: i32) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .matches_by_section
            .get(&section)
            .map(|keys| {
                keys.iter()
                    .filter_map(|k| self.matches.get(k).map(|mt| MatchRecord::new(k.0, k.1, *mt)))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn matches(&self, match_type: Option<MatchType>) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .matches
            .iter()
            .filter(|(_, mt)| match_type.map_or(true, |want| want == **mt))
            .map(|(k, mt)| MatchRecord::new(k.0, k.1, *mt))
            .collect())
    }

    fn sections(&self) -> Result<Vec<i32>, StoreError> {
        Ok(self.by_section.keys().copied().collect())
    }
}
