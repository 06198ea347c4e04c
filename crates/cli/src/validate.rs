//! `tracemerge validate`: check a config and series files without touching a store.

use std::path::PathBuf;

use serde::Serialize;

use tracemerge_core::Series;

use crate::exit_codes::EXIT_INVALID_GEOMETRY;
use crate::util::{load_config, load_series, write_json};
use crate::CliError;

#[derive(Debug, Serialize)]
struct GeometryIssue {
    series: usize,
    section: i32,
    index: usize,
    name: String,
    error: String,
}

fn geometry_issues(series: &[Series]) -> Vec<GeometryIssue> {
    let mut issues = Vec::new();
    for (s, ser) in series.iter().enumerate() {
        for section in &ser.sections {
            for (index, contour) in section.contours.iter().enumerate() {
                if let Err(e) = contour.shape().validate() {
                    issues.push(GeometryIssue {
                        series: s,
                        section: section.index,
                        index,
                        name: contour.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
    issues
}

pub fn cmd_validate(
    config: Option<PathBuf>,
    series_files: Vec<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    if config.is_none() && series_files.is_empty() {
        return Err(CliError::args("nothing to validate")
            .with_hint("pass --config FILE and/or --series FILE"));
    }

    if let Some(ref path) = config {
        load_config(Some(path.as_path()))?;
        if !json_output {
            println!("{}: ok", path.display());
        }
    }

    let series = load_series(&series_files)?;
    let issues = geometry_issues(&series);

    if json_output {
        write_json(&issues, None)?;
    } else {
        for (path, s) in series_files.iter().zip(&series) {
            println!("{}: {} section(s), {} contour(s)", path.display(), s.sections.len(), s.contour_count());
        }
        for i in &issues {
            println!(
                "  series {} section {} contour {} ({}): {}",
                i.series, i.section, i.index, i.name, i.error
            );
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_INVALID_GEOMETRY,
            message: format!("{} contour(s) with unusable geometry", issues.len()),
            hint: Some("these contours are reported as diagnostics and never matched".into()),
        })
    }
}
