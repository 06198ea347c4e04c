//! `tracemerge merge`: reduce curation decisions into one merged series.

use std::path::PathBuf;

use tracemerge_core::SeriesId;
use tracemerge_recon::{build_review, default_decisions, reduce, CurationDecision};
use tracemerge_store::EntityStore;

use crate::util::{load_config, load_series, open_existing_store, read_json, write_json, SourceArgs};
use crate::CliError;

pub fn cmd_merge(
    sources: SourceArgs,
    decisions_file: Option<PathBuf>,
    accept_defaults: bool,
    base: Option<u32>,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(sources.config.as_deref())?;
    let series = load_series(&sources.series)?;
    let store = open_existing_store(&sources.db, &config)?;

    let decisions: Vec<CurationDecision> = match (decisions_file, accept_defaults) {
        (Some(path), _) => read_json(&path)?,
        (None, true) => {
            let mut all = Vec::new();
            for section in store.sections().map_err(|e| CliError::recon(e.into()))? {
                let review = build_review(&store, &series, section).map_err(CliError::recon)?;
                all.extend(default_decisions(&review));
            }
            all
        }
        (None, false) => {
            return Err(CliError::args("no decisions given")
                .with_hint("pass --decisions FILE or --accept-defaults"))
        }
    };

    let base = base.map(SeriesId).unwrap_or(config.merge.base_series);
    let (merged, report) =
        reduce(&store, &series, base, &decisions, &config.merge.category_order)
            .map_err(CliError::recon)?;

    write_json(&merged, output_file.as_deref())?;
    eprintln!(
        "merged {} contour(s) across {} section(s): {} discarded, {} duplicate keep(s) skipped",
        report.kept, report.sections, report.discarded, report.skipped_duplicates
    );
    Ok(())
}
