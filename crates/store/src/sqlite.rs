// SQLite-backed entity store

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Params, Row};

use tracemerge_core::{ContourId, ContourRef, MatchRecord, MatchType, SeriesId};

use crate::{
    check_contour_batch, DuplicatePolicy, EntityStore, InsertReport, NewContour, StoreError,
    StoredContour,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sections (
    section INTEGER PRIMARY KEY    -- one row per ingested section, empty ones included
);

CREATE TABLE IF NOT EXISTS contours (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    series INTEGER NOT NULL,
    section INTEGER NOT NULL,
    idx INTEGER NOT NULL,          -- position within the source section
    name TEXT NOT NULL,
    UNIQUE (series, section, idx)
);

CREATE INDEX IF NOT EXISTS contours_by_section ON contours (section);

CREATE TABLE IF NOT EXISTS matches (
    id1 INTEGER NOT NULL REFERENCES contours (id),
    id2 INTEGER NOT NULL REFERENCES contours (id),
    match_type TEXT NOT NULL,      -- exact | potential | potential_realigned
    PRIMARY KEY (id1, id2)
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const SCHEMA_VERSION: &str = "2";

const CONTOUR_COLUMNS: &str = "id, series, section, idx, name";

pub struct SqliteStore {
    conn: Connection,
    policy: DuplicatePolicy,
}

impl SqliteStore {
    pub fn open(path: &Path, policy: DuplicatePolicy) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn, policy)
    }

    pub fn open_in_memory(policy: DuplicatePolicy) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, policy)
    }

    fn init(conn: Connection, policy: DuplicatePolicy) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        let version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
            .optional()?;
        match version.as_deref() {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(SCHEMA_VERSION) => {}
            Some(other) => {
                return Err(StoreError::Corrupt(format!("unsupported schema version {other}")));
            }
        }
        Ok(Self { conn, policy })
    }

    fn query_contours(
        &self,
        filter: &str,
        arg: i64,
    ) -> Result<Vec<StoredContour>, StoreError> {
        let sql = format!("SELECT {CONTOUR_COLUMNS} FROM contours WHERE {filter} = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![arg], row_to_contour)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_matches<P: Params>(&self, sql: &str, args: P) -> Result<Vec<MatchRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(args, |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter()
            .map(|(id1, id2, mt)| {
                let match_type = mt.parse::<MatchType>().map_err(StoreError::Corrupt)?;
                Ok(MatchRecord::new(id1, id2, match_type))
            })
            .collect()
    }
}

fn row_to_contour(row: &Row<'_>) -> rusqlite::Result<StoredContour> {
    let series: i64 = row.get(1)?;
    let idx: i64 = row.get(3)?;
    let series = u32::try_from(series).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(1, series))?;
    let index = usize::try_from(idx).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, idx))?;
    Ok(StoredContour {
        id: row.get(0)?,
        location: ContourRef { series: SeriesId(series), section: row.get(2)?, index },
        name: row.get(4)?,
    })
}

impl EntityStore for SqliteStore {
    fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }

    fn insert_contours(
        &mut self,
        section: i32,
        batch: &[NewContour],
    ) -> Result<Vec<StoredContour>, StoreError> {
        check_contour_batch(section, batch)?;

        let tx = self.conn.transaction()?;
        let claimed = tx.execute(
            "INSERT OR IGNORE INTO sections (section) VALUES (?1)",
            params![section],
        )?;
        if claimed == 0 {
            return Err(StoreError::SectionAlreadyIngested(section));
        }

        let mut stored = Vec::with_capacity(batch.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO contours (series, section, idx, name) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for c in batch {
                stmt.execute(params![
                    c.location.series.0 as i64,
                    c.location.section,
                    c.location.index as i64,
                    c.name,
                ])?;
                stored.push(StoredContour {
                    id: tx.last_insert_rowid(),
                    location: c.location,
                    name: c.name.clone(),
                });
            }
        }
        tx.commit()?;

        tracing::debug!(section, count = stored.len(), "ingested contours");
        Ok(stored)
    }

    fn insert_matches(
        &mut self,
        section: i32,
        records: &[MatchRecord],
    ) -> Result<InsertReport, StoreError> {
        let policy = self.policy;
        let tx = self.conn.transaction()?;
        let mut report = InsertReport::default();
        let mut seen: HashSet<(ContourId, ContourId)> = HashSet::new();

        {
            let mut section_of = tx.prepare("SELECT section FROM contours WHERE id = ?1")?;
            let mut exists = tx.prepare("SELECT 1 FROM matches WHERE id1 = ?1 AND id2 = ?2")?;
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO matches (id1, id2, match_type) VALUES (?1, ?2, ?3)",
            )?;

            for r in records {
                if r.id1 == r.id2 {
                    return Err(StoreError::SelfMatch { id1: r.id1, id2: r.id2 });
                }
                for id in [r.id1, r.id2] {
                    let actual: Option<i32> =
                        section_of.query_row(params![id], |row| row.get(0)).optional()?;
                    match actual {
                        None => return Err(StoreError::UnknownContour { id }),
                        Some(actual) if actual != section => {
                            return Err(StoreError::SectionMismatch { id, expected: section, actual })
                        }
                        Some(_) => {}
                    }
                }

                let stored = exists.exists(params![r.id1, r.id2])?;
                let repeated = !seen.insert((r.id1, r.id2));
                if stored || repeated {
                    match policy {
                        DuplicatePolicy::Reject => {
                            return Err(StoreError::DuplicateMatch { id1: r.id1, id2: r.id2 })
                        }
                        DuplicatePolicy::Ignore => {
                            report.skipped_duplicates += 1;
                            continue;
                        }
                    }
                }
                report.inserted += insert.execute(params![r.id1, r.id2, r.match_type.as_str()])?;
            }
        }
        tx.commit()?;

        tracing::debug!(
            section,
            inserted = report.inserted,
            skipped = report.skipped_duplicates,
            "committed match batch"
        );
        Ok(report)
    }

    fn contour(&self, id: ContourId) -> Result<Option<StoredContour>, StoreError> {
        let sql = format!("SELECT {CONTOUR_COLUMNS} FROM contours WHERE id = ?1");
        Ok(self.conn.query_row(&sql, params![id], row_to_contour).optional()?)
    }

    fn contours_in_section(&self, section: i32) -> Result<Vec<StoredContour>, StoreError> {
        self.query_contours("section", section as i64)
    }

    fn contours_in_series(&self, series: SeriesId) -> Result<Vec<StoredContour>, StoreError> {
        self.query_contours("series", series.0 as i64)
    }

    fn matches_in_section(&self, section: i32) -> Result<Vec<MatchRecord>, StoreError> {
        self.query_matches(
            "SELECT m.id1, m.id2, m.match_type FROM matches m \
             JOIN contours c ON c.id = m.id1 \
             WHERE c.section = ?1 ORDER BY m.id1, m.id2",
            params![section],
        )
    }

    fn matches(&self, match_type: Option<MatchType>) -> Result<Vec<MatchRecord>, StoreError> {
        match match_type {
            Some(mt) => self.query_matches(
                "SELECT id1, id2, match_type FROM matches WHERE match_type = ?1 ORDER BY id1, id2",
                params![mt.as_str()],
            ),
            None => self.query_matches(
                "SELECT id1, id2, match_type FROM matches ORDER BY id1, id2",
                [],
            ),
        }
    }

    fn sections(&self) -> Result<Vec<i32>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT section FROM sections ORDER BY section")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<i32>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(series: u32, section: i32, n: usize) -> Vec<NewContour> {
        (0..n)
            .map(|i| NewContour {
                location: ContourRef { series: SeriesId(series), section, index: i },
                name: format!("s{series}c{i}"),
            })
            .collect()
    }

    #[test]
    fn round_trips_contours() {
        let mut store = SqliteStore::open_in_memory(DuplicatePolicy::Ignore).unwrap();
        let mut contours = batch(0, 4, 2);
        contours.extend(batch(1, 4, 1));
        let stored = store.insert_contours(4, &contours).unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.windows(2).all(|w| w[0].id < w[1].id));

        let loaded = store.contours_in_section(4).unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(store.contour(stored[2].id).unwrap(), Some(stored[2].clone()));
        assert_eq!(store.contours_in_series(SeriesId(1)).unwrap(), vec![stored[2].clone()]);
        assert_eq!(store.contour(999).unwrap(), None);
    }

    #[test]
    fn failed_match_batch_rolls_back() {
        let mut store = SqliteStore::open_in_memory(DuplicatePolicy::Reject).unwrap();
        let stored = store.insert_contours(1, &batch(0, 1, 3)).unwrap();
        let (a, b, c) = (stored[0].id, stored[1].id, stored[2].id);

        store
            .insert_matches(1, &[MatchRecord::new(a, b, MatchType::Exact)])
            .unwrap();
        let err = store
            .insert_matches(
                1,
                &[
                    MatchRecord::new(a, c, MatchType::Potential),
                    MatchRecord::new(a, b, MatchType::Potential),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMatch { .. }));
        assert_eq!(
            store.matches_in_section(1).unwrap(),
            vec![MatchRecord::new(a, b, MatchType::Exact)]
        );
    }

    #[test]
    fn ignore_policy_counts_skips() {
        let mut store = SqliteStore::open_in_memory(DuplicatePolicy::Ignore).unwrap();
        let stored = store.insert_contours(1, &batch(0, 1, 2)).unwrap();
        let rec = MatchRecord::new(stored[0].id, stored[1].id, MatchType::PotentialRealigned);
        let first = store.insert_matches(1, &[rec]).unwrap();
        let second = store.insert_matches(1, &[rec, rec]).unwrap();
        assert_eq!(first, InsertReport { inserted: 1, skipped_duplicates: 0 });
        assert_eq!(second, InsertReport { inserted: 0, skipped_duplicates: 2 });
        assert_eq!(store.matches(Some(MatchType::PotentialRealigned)).unwrap(), vec![rec]);
        assert!(store.matches(Some(MatchType::Exact)).unwrap().is_empty());
    }

    #[test]
    fn reingesting_a_section_fails() {
        let mut store = SqliteStore::open_in_memory(DuplicatePolicy::Ignore).unwrap();
        store.insert_contours(2, &batch(0, 2, 1)).unwrap();
        let err = store.insert_contours(2, &batch(1, 2, 1)).unwrap_err();
        assert!(matches!(err, StoreError::SectionAlreadyIngested(2)));
        assert_eq!(store.contours_in_section(2).unwrap().len(), 1);
        assert_eq!(store.sections().unwrap(), vec![2]);
    }

    #[test]
    fn empty_section_counts_as_ingested() {
        let mut store = SqliteStore::open_in_memory(DuplicatePolicy::Ignore).unwrap();
        assert!(store.insert_contours(5, &[]).unwrap().is_empty());
        assert_eq!(store.sections().unwrap(), vec![5]);
        let err = store.insert_contours(5, &batch(0, 5, 1)).unwrap_err();
        assert!(matches!(err, StoreError::SectionAlreadyIngested(5)));
        assert!(store.contours_in_section(5).unwrap().is_empty());
    }
}
