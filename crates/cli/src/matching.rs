//! `tracemerge match`: ingest every section and store its match edges.

use std::path::PathBuf;

use tracemerge_recon::engine::run_matching;
use tracemerge_recon::MatchRunReport;
use tracemerge_store::SqliteStore;

use crate::util::{load_config, load_series, write_json, SourceArgs};
use crate::CliError;

pub fn cmd_match(
    sources: SourceArgs,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(sources.config.as_deref())?;
    let series = load_series(&sources.series)?;

    let mut store = SqliteStore::open(&sources.db, config.store.duplicate_policy)
        .map_err(|e| CliError::recon(e.into()))?;
    let geometry = config.matching.geometry();
    let report = run_matching(&mut store, &series, &config, &geometry).map_err(CliError::recon)?;

    if let Some(ref path) = output_file {
        write_json(&report, Some(path))?;
    }
    if json_output {
        write_json(&report, None)?;
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &MatchRunReport) {
    let s = &report.summary;
    println!("Series:       {}", report.meta.series.join(", "));
    println!("Sections:     {}", s.sections);
    println!("Contours:     {}", s.contours);
    println!("Pairs:        {}", s.pairs_evaluated);
    println!("Matches:      {} new, {} already stored", s.inserted, s.skipped_duplicates);
    if s.diagnostics > 0 {
        println!("Diagnostics:  {} malformed pair(s)", s.diagnostics);
        for (section, count) in &s.sections_with_diagnostics {
            println!("  section {section}: {count}");
        }
    }
}
