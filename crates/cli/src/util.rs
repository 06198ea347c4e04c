use std::path::{Path, PathBuf};

use clap::Args;
use serde::de::DeserializeOwned;
use serde::Serialize;

use tracemerge_core::Series;
use tracemerge_recon::MergeConfig;
use tracemerge_store::SqliteStore;

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_PARSE, EXIT_USAGE};
use crate::CliError;

/// Inputs shared by every command that touches the store.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Series JSON file. Repeat in a fixed order: position is the series id
    #[arg(long = "series", short = 's', value_name = "FILE", required = true)]
    pub series: Vec<PathBuf>,

    /// SQLite match store
    #[arg(long, env = "TRACEMERGE_DB", value_name = "FILE")]
    pub db: PathBuf,

    /// tracemerge.toml (defaults apply when omitted)
    #[arg(long, short = 'c', env = "TRACEMERGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<MergeConfig, CliError> {
    let Some(path) = path else {
        return Ok(MergeConfig::default());
    };
    let text = read_file(path)?;
    MergeConfig::from_toml(&text).map_err(|e| {
        CliError { code: EXIT_INVALID_CONFIG, message: format!("{}: {e}", path.display()), hint: None }
    })
}

pub(crate) fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|e| CliError {
        code: EXIT_PARSE,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

pub(crate) fn load_series(paths: &[PathBuf]) -> Result<Vec<Series>, CliError> {
    let series = paths.iter().map(|p| read_json::<Series>(p)).collect::<Result<Vec<_>, _>>()?;
    for (i, s) in series.iter().enumerate() {
        tracing::debug!(series = i, name = %s.name, contours = s.contour_count(), "loaded series");
    }
    Ok(series)
}

/// Open the store for a command that reads earlier `match` results.
pub(crate) fn open_existing_store(
    db: &Path,
    config: &MergeConfig,
) -> Result<SqliteStore, CliError> {
    if !db.exists() {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("store not found: {}", db.display()),
            hint: Some("run `tracemerge match` first".into()),
        });
    }
    SqliteStore::open(db, config.store.duplicate_policy).map_err(|e| CliError::recon(e.into()))
}

/// Pretty JSON to `output`, or to stdout when `None`.
pub(crate) fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
