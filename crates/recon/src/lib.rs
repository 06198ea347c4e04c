//! `tracemerge-recon`: contour matching, grouping and merge reduction.
//!
//! Pure engine crate: receives source Series and an entity store, returns
//! match batches, review payloads and merged Series. No CLI or file IO.

pub mod classify;
pub mod config;
pub mod curation;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod group;
pub mod index;
pub mod model;
pub mod reduce;

pub use classify::classify;
pub use config::MergeConfig;
pub use curation::{build_review, default_decisions};
pub use engine::{ingest_section, match_section, run_matching};
pub use error::ReconError;
pub use group::{compute_uniques, group_by_section};
pub use index::{build_matches, MatchBatch, SectionContour};
pub use model::{CurationDecision, MatchRunReport, MergeReport, ReviewEntry, SectionReview};
pub use reduce::{reduce, MergedSeriesBuilder};
