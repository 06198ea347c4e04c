//! `tracemerge review`: review payloads for the curator.

use std::path::PathBuf;

use tracemerge_recon::{build_review, default_decisions, SectionReview};
use tracemerge_store::EntityStore;

use crate::util::{load_config, load_series, open_existing_store, write_json, SourceArgs};
use crate::CliError;

pub fn cmd_review(
    sources: SourceArgs,
    section: Option<i32>,
    decisions_only: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(sources.config.as_deref())?;
    let series = load_series(&sources.series)?;
    let store = open_existing_store(&sources.db, &config)?;

    let sections = match section {
        Some(s) => vec![s],
        None => store.sections().map_err(|e| CliError::recon(e.into()))?,
    };
    let reviews = sections
        .into_iter()
        .map(|s| build_review(&store, &series, s))
        .collect::<Result<Vec<SectionReview>, _>>()
        .map_err(CliError::recon)?;

    if decisions_only {
        let decisions: Vec<_> = reviews.iter().flat_map(default_decisions).collect();
        write_json(&decisions, output_file.as_deref())
    } else {
        write_json(&reviews, output_file.as_deref())
    }
}
