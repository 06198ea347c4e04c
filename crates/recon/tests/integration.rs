use std::collections::{BTreeMap, BTreeSet};

use tempfile::TempDir;

use tracemerge_core::{
    Contour, MatchRecord, MatchType, PlanarGeometry, Point, ReviewCategory, Section, Series,
    SeriesId, Transform,
};
use tracemerge_recon::config::MergeConfig;
use tracemerge_recon::{
    build_review, classify, compute_uniques, default_decisions, group_by_section, reduce,
    run_matching, CurationDecision, ReconError,
};
use tracemerge_store::{DuplicatePolicy, EntityStore, MemoryStore, SqliteStore, StoreError};

fn square(name: &str, x: f64, y: f64, size: f64) -> Contour {
    Contour::new(
        name,
        vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ],
        Transform::identity(),
    )
}

fn series_with(name: &str, section: i32, contours: Vec<Contour>) -> Series {
    let mut series = Series::new(name);
    series.sections.push(Section { contours, ..Section::new(section) });
    series
}

/// A and C traced in the first series, B in the second. A and B coincide,
/// C lies far away.
fn abc_sources() -> Vec<Series> {
    vec![
        series_with("alice", 12, vec![square("mito1", 0.0, 0.0, 4.0), square("mito1", 40.0, 40.0, 4.0)]),
        series_with("bob", 12, vec![square("mito1", 0.0, 0.0, 4.0)]),
    ]
}

fn matched_store(sources: &[Series]) -> MemoryStore {
    let mut store = MemoryStore::new(DuplicatePolicy::Ignore);
    let config = MergeConfig::default();
    run_matching(&mut store, sources, &config, &config.matching.geometry()).unwrap();
    store
}

// -------------------------------------------------------------------------
// Classification scenarios
// -------------------------------------------------------------------------

#[test]
fn abc_section_classification() {
    let sources = abc_sources();
    let a = &sources[0].sections[0].contours[0];
    let c = &sources[0].sections[0].contours[1];
    let b = &sources[1].sections[0].contours[0];
    let g = PlanarGeometry::default();

    assert_eq!(classify(a, b, &g).unwrap(), Some(MatchType::Exact));
    assert_eq!(classify(a, c, &g).unwrap(), None);
    assert_eq!(classify(b, c, &g).unwrap(), None);
}

#[test]
fn abc_section_groups_and_uniques() {
    let sources = abc_sources();
    let store = matched_store(&sources);

    // Ingest order: alice's A (1), alice's C (2), bob's B (3).
    let groups = group_by_section(&store, 12).unwrap();
    let expected: BTreeMap<_, _> =
        [(1, [(MatchType::Exact, BTreeSet::from([3]))].into_iter().collect::<BTreeMap<_, _>>())]
            .into_iter()
            .collect();
    assert_eq!(groups, expected);
    assert_eq!(compute_uniques(&store, 12).unwrap(), BTreeSet::from([2]));
}

#[test]
fn identical_points_under_new_transform_are_realigned() {
    let d = square("axon", 0.0, 0.0, 3.0);
    let mut e = d.clone();
    e.transform = Transform::new(1, [500.0, 1.0, 0.0, 0.0, 0.0, 0.0], [-500.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    assert_eq!(
        classify(&d, &e, &PlanarGeometry::default()).unwrap(),
        Some(MatchType::PotentialRealigned)
    );
}

#[test]
fn name_mismatch_never_matches() {
    let a = square("mito1", 0.0, 0.0, 4.0);
    let b = a.renamed("mito2");
    let mut c = b.clone();
    c.transform = Transform::translation(1.0, 1.0);
    let g = PlanarGeometry::default();
    assert_eq!(classify(&a, &b, &g).unwrap(), None);
    assert_eq!(classify(&a, &c, &g).unwrap(), None);
}

// -------------------------------------------------------------------------
// Review + Merge
// -------------------------------------------------------------------------

#[test]
fn review_payload_defaults() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let review = build_review(&store, &sources, 12).unwrap();

    assert_eq!(review.exact.len(), 1);
    let group = &review.exact[0];
    assert_eq!(group.iter().map(|e| (e.contour_id, e.keep)).collect::<Vec<_>>(), vec![(1, true), (3, false)]);
    assert_eq!(group[1].series, SeriesId(1));
    assert!(review.potential.is_empty());
    assert!(review.potential_realigned.is_empty());
    assert_eq!(review.unique.len(), 1);
    assert_eq!(review.unique[0][0].contour_id, 2);
    assert_eq!(review.unique[0][0].bounds, Some([40.0, 40.0, 44.0, 44.0]));
}

#[test]
fn merge_keeps_renamed_a_and_c_in_index_order() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let decisions = vec![
        CurationDecision::keep(1, ReviewCategory::Exact).renamed("mito1_final"),
        CurationDecision::discard(3, ReviewCategory::Exact),
        CurationDecision::keep(2, ReviewCategory::Unique),
    ];

    let (merged, report) =
        reduce(&store, &sources, SeriesId(0), &decisions, &ReviewCategory::DEFAULT_ORDER).unwrap();

    assert_eq!(merged.name, "alice");
    assert_eq!(merged.sections.len(), 1);
    let names: Vec<&str> = merged.sections[0].contours.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["mito1_final", "mito1"]);
    assert_eq!(merged.sections[0].contours[1].points, sources[0].sections[0].contours[1].points);
    assert_eq!(report.kept, 2);
    assert_eq!(report.discarded, 1);

    // Sources are untouched.
    assert_eq!(sources[0].sections[0].contours[0].name, "mito1");
}

#[test]
fn default_decisions_merge_one_copy_per_structure() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let review = build_review(&store, &sources, 12).unwrap();
    let decisions = default_decisions(&review);

    let (merged, report) =
        reduce(&store, &sources, SeriesId(1), &decisions, &ReviewCategory::DEFAULT_ORDER).unwrap();
    assert_eq!(merged.name, "bob");
    assert_eq!(merged.contour_count(), 2);
    assert_eq!(report.kept, 2);
}

#[test]
fn contour_kept_in_two_groups_appears_once() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let decisions = vec![
        CurationDecision::keep(1, ReviewCategory::Exact).renamed("from_exact"),
        CurationDecision::keep(1, ReviewCategory::Potential).renamed("from_potential"),
        CurationDecision::keep(2, ReviewCategory::Unique),
    ];

    let (merged, report) =
        reduce(&store, &sources, SeriesId(0), &decisions, &ReviewCategory::DEFAULT_ORDER).unwrap();
    let names: Vec<&str> = merged.sections[0].contours.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["from_exact", "mito1"]);
    assert_eq!(report.skipped_duplicates, 1);

    // A different category order changes which copy wins.
    let order = [
        ReviewCategory::Potential,
        ReviewCategory::Exact,
        ReviewCategory::PotentialRealigned,
        ReviewCategory::Unique,
    ];
    let (merged, _) = reduce(&store, &sources, SeriesId(0), &decisions, &order).unwrap();
    assert_eq!(merged.sections[0].contours[0].name, "from_potential");
}

#[test]
fn unresolved_decisions_fail_with_every_id() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let decisions = vec![
        CurationDecision::keep(99, ReviewCategory::Unique),
        CurationDecision::keep(1, ReviewCategory::Exact),
        CurationDecision::discard(42, ReviewCategory::Exact),
        CurationDecision::keep(99, ReviewCategory::Exact),
    ];
    let err = reduce(&store, &sources, SeriesId(0), &decisions, &ReviewCategory::DEFAULT_ORDER)
        .unwrap_err();
    match err {
        ReconError::UnresolvedContours(ids) => assert_eq!(ids, vec![42, 99]),
        other => panic!("unexpected error: {other}"),
    }

    // A store id whose source contour has gone missing is also unresolved.
    let truncated = vec![sources[0].clone(), Series::new("bob")];
    let err = reduce(
        &store,
        &truncated,
        SeriesId(0),
        &[CurationDecision::keep(3, ReviewCategory::Exact)],
        &ReviewCategory::DEFAULT_ORDER,
    )
    .unwrap_err();
    assert!(matches!(err, ReconError::UnresolvedContours(ids) if ids == vec![3]));
}

#[test]
fn unknown_base_series_is_rejected() {
    let sources = abc_sources();
    let store = matched_store(&sources);
    let err = reduce(&store, &sources, SeriesId(7), &[], &ReviewCategory::DEFAULT_ORDER).unwrap_err();
    assert!(matches!(err, ReconError::UnknownSeries(SeriesId(7))));
}

#[test]
fn sections_missing_from_base_are_created() {
    let mut sources = abc_sources();
    sources[1].sections.push(Section {
        thickness: 0.08,
        contours: vec![square("vesicle", 1.0, 1.0, 1.0)],
        ..Section::new(13)
    });
    let store = matched_store(&sources);
    let vesicle = store.contours_in_section(13).unwrap()[0].id;

    let (merged, _) = reduce(
        &store,
        &sources,
        SeriesId(0),
        &[CurationDecision::keep(vesicle, ReviewCategory::Unique)],
        &ReviewCategory::DEFAULT_ORDER,
    )
    .unwrap();
    assert_eq!(merged.sections.iter().map(|s| s.index).collect::<Vec<_>>(), vec![12, 13]);
    assert!(merged.sections[0].contours.is_empty());
    assert_eq!(merged.sections[1].thickness, 0.08);
    assert_eq!(merged.sections[1].contours[0].name, "vesicle");
}

// -------------------------------------------------------------------------
// Run + Store
// -------------------------------------------------------------------------

#[test]
fn malformed_contour_does_not_abort_the_run() {
    let mut sources = abc_sources();
    sources[1].sections[0].contours.push(Contour::new(
        "mito1",
        vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
        Transform::identity(),
    ));
    let store_report = {
        let mut store = MemoryStore::new(DuplicatePolicy::Ignore);
        let config = MergeConfig::default();
        let report = run_matching(&mut store, &sources, &config, &config.matching.geometry()).unwrap();
        assert_eq!(store.matches(None).unwrap(), vec![MatchRecord::new(1, 3, MatchType::Exact)]);
        report
    };
    assert_eq!(store_report.summary.pairs_evaluated, 6);
    assert_eq!(store_report.summary.diagnostics, 3);
    assert!(store_report.sections[0].diagnostics.iter().all(|d| d.id2 == 4));
}

#[test]
fn reject_policy_fails_a_rerun_atomically() {
    let sources = abc_sources();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tracemerge.db");
    let config = MergeConfig::default();
    let geometry = config.matching.geometry();

    {
        let mut store = SqliteStore::open(&path, DuplicatePolicy::Reject).unwrap();
        let report = run_matching(&mut store, &sources, &config, &geometry).unwrap();
        assert_eq!(report.summary.inserted, 1);
        assert_eq!(report.meta.series, vec!["alice", "bob"]);
    }

    let mut store = SqliteStore::open(&path, DuplicatePolicy::Reject).unwrap();
    let err = run_matching(&mut store, &sources, &config, &geometry).unwrap_err();
    assert!(matches!(err, ReconError::Store(StoreError::DuplicateMatch { id1: 1, id2: 3 })));
    assert_eq!(store.matches(None).unwrap().len(), 1);

    // The persisted store still drives review and merge.
    let review = build_review(&store, &sources, 12).unwrap();
    let (merged, _) = reduce(
        &store,
        &sources,
        SeriesId(0),
        &default_decisions(&review),
        &ReviewCategory::DEFAULT_ORDER,
    )
    .unwrap();
    assert_eq!(merged.contour_count(), 2);
}
