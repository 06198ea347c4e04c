// tracemerge CLI - match, review and merge traced serial-section series

mod exit_codes;
mod logging;
mod matching;
mod merge;
mod review;
mod util;
mod validate;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use tracemerge_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use logging::{init_logging, LogConfig};
use util::SourceArgs;

#[derive(Parser)]
#[command(name = "tracemerge")]
#[command(about = "Find duplicate contours across traced series and merge them into one")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every section and store contour match edges
    #[command(after_help = "\
Examples:
  tracemerge match -s alice.json -s bob.json --db volume.db
  tracemerge match -s alice.json -s bob.json --db volume.db --json
  tracemerge match -s alice.json -s bob.json --db volume.db -c tracemerge.toml --output run.json")]
    Match {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output JSON report to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Build curator review payloads from stored matches
    #[command(after_help = "\
Examples:
  tracemerge review -s alice.json -s bob.json --db volume.db
  tracemerge review -s alice.json -s bob.json --db volume.db --section 12
  tracemerge review -s alice.json -s bob.json --db volume.db --decisions-only -o decisions.json")]
    Review {
        #[command(flatten)]
        sources: SourceArgs,

        /// Only this section (default: every stored section)
        #[arg(long)]
        section: Option<i32>,

        /// Emit the default keep/discard decisions instead of the payload
        #[arg(long)]
        decisions_only: bool,

        /// Write JSON to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Reduce curation decisions into one merged series
    #[command(after_help = "\
Examples:
  tracemerge merge -s alice.json -s bob.json --db volume.db --decisions decisions.json -o merged.json
  tracemerge merge -s alice.json -s bob.json --db volume.db --accept-defaults --base 1 -o merged.json")]
    Merge {
        #[command(flatten)]
        sources: SourceArgs,

        /// JSON array of curation decisions
        #[arg(long, value_name = "FILE")]
        decisions: Option<PathBuf>,

        /// Use the default decision of every review group
        #[arg(long, conflicts_with = "decisions")]
        accept_defaults: bool,

        /// Series whose metadata seeds the output (overrides merge.base_series)
        #[arg(long)]
        base: Option<u32>,

        /// Write merged series JSON to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check a config file and series geometry without touching a store
    #[command(after_help = "\
Examples:
  tracemerge validate --config tracemerge.toml
  tracemerge validate -s alice.json -s bob.json --json")]
    Validate {
        /// tracemerge.toml to parse and validate
        #[arg(long, short = 'c', value_name = "FILE")]
        config: Option<PathBuf>,

        /// Series JSON files to check
        #[arg(long = "series", short = 's', value_name = "FILE")]
        series: Vec<PathBuf>,

        /// Output geometry issues as JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("TRACEMERGE_GIT_HASH"), ")",
        "\nengine:  tracemerge-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TRACEMERGE_TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_verbosity(cli.verbose).with_ansi(std::io::stderr().is_terminal()));

    let result = match cli.command {
        Commands::Match { sources, json, output } => matching::cmd_match(sources, json, output),
        Commands::Review { sources, section, decisions_only, output } => {
            review::cmd_review(sources, section, decisions_only, output)
        }
        Commands::Merge { sources, decisions, accept_defaults, base, output } => {
            merge::cmd_merge(sources, decisions, accept_defaults, base, output)
        }
        Commands::Validate { config, series, json } => validate::cmd_validate(config, series, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with proper exit code.
    pub fn recon(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::Store(tracemerge_store::StoreError::DuplicateMatch { .. }) => Some(
                "the store already holds these matches; set duplicate_policy = \"ignore\" under [store] to skip them"
                    .to_string(),
            ),
            ReconError::UnresolvedContours(_) | ReconError::MissingContour { .. } => Some(
                "pass the same --series files, in the same order, used for `tracemerge match`"
                    .to_string(),
            ),
            ReconError::UnknownSeries(_) => {
                Some("the base series must be below the number of --series files".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
