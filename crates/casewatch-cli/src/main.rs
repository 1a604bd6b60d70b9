mod check;
mod watch;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use casewatch_core::StateConfig;
use casewatch_core::config::STATE_DIR_ENV;
use casewatch_store::{CursorStore, JsonCursorStore};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "casewatch",
    version,
    about = "Watch surplus-funds listings for change"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceFormat {
    Csv,
    Html,
    Document,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one change-detection cycle per URL and print new results as JSON lines.
    Run {
        #[arg(long, value_enum)]
        format: SourceFormat,

        /// Watcher name; cursors are kept under `<state-dir>/<name>/`.
        #[arg(long)]
        name: String,

        /// Source URL to watch (repeatable).
        #[arg(long = "url", required = true)]
        urls: Vec<String>,

        /// Two-letter state code stamped on every record.
        #[arg(long)]
        state: String,

        #[arg(long)]
        county: String,

        /// Defaults to the watcher name.
        #[arg(long)]
        source_system: Option<String>,

        /// Cursor state root; `.state` when unset.
        #[arg(long, env = STATE_DIR_ENV)]
        state_dir: Option<PathBuf>,

        /// Per-request timeout in seconds.
        #[arg(long, env = "CASEWATCH_HTTP_TIMEOUT", default_value_t = 30)]
        timeout: u64,
    },

    /// Print the stored cursors for a watcher.
    Cursors {
        #[arg(long)]
        name: String,

        #[arg(long, env = STATE_DIR_ENV)]
        state_dir: Option<PathBuf>,
    },

    /// Validate a JSON-lines file of `{normalized_case, source}` envelopes.
    Validate {
        path: PathBuf,
    },
}

fn state_config(state_dir: Option<PathBuf>) -> StateConfig {
    state_dir.map(StateConfig::new).unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::debug!("casewatch v{}", env!("CARGO_PKG_VERSION"));

    match Cli::parse().command {
        Commands::Run {
            format,
            name,
            urls,
            state,
            county,
            source_system,
            state_dir,
            timeout,
        } => {
            let watch = watch::Watch {
                format,
                source_system: source_system.unwrap_or_else(|| name.clone()),
                name,
                state,
                county,
                timeout: Duration::from_secs(timeout),
            };
            watch::run(&watch, &urls, &state_config(state_dir)).await?;
        }
        Commands::Cursors { name, state_dir } => {
            let store = JsonCursorStore::open_for(&state_config(state_dir), &name);
            let json = serde_json::to_string_pretty(&store.snapshot())
                .context("serialising cursors")?;
            println!("{json}");
        }
        Commands::Validate { path } => {
            let summary = check::validate_file(&path)?;
            eprintln!("{} valid, {} rejected", summary.valid, summary.rejects.len());
            if !summary.rejects.is_empty() {
                anyhow::bail!(
                    "{} rejected record(s) in {}",
                    summary.rejects.len(),
                    path.display()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parses_run_with_repeated_urls() {
        let cli = Cli::try_parse_from([
            "casewatch",
            "run",
            "--format",
            "html",
            "--name",
            "html_table_overages",
            "--url",
            "https://a.example.gov/list",
            "--url",
            "https://b.example.gov/list",
            "--state",
            "TX",
            "--county",
            "TRAVIS",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                format,
                urls,
                source_system,
                timeout,
                ..
            } => {
                assert_eq!(format, SourceFormat::Html);
                assert_eq!(urls.len(), 2);
                assert!(source_system.is_none());
                assert_eq!(timeout, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_requires_a_url() {
        let err = Cli::try_parse_from([
            "casewatch", "run", "--format", "csv", "--name", "w", "--state", "WA", "--county",
            "KING",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn state_dir_reads_environment() {
        let command = Cli::command();
        for sub in ["run", "cursors"] {
            let arg = command
                .find_subcommand(sub)
                .unwrap()
                .get_arguments()
                .find(|a| a.get_id() == "state_dir")
                .unwrap();
            assert_eq!(arg.get_env(), Some(std::ffi::OsStr::new(STATE_DIR_ENV)));
        }
    }

    #[test]
    fn missing_state_dir_uses_default_root() {
        assert_eq!(state_config(None).root, PathBuf::from(".state"));
    }

    #[test]
    fn explicit_state_dir_wins() {
        let config = state_config(Some(PathBuf::from("/tmp/cw")));
        assert_eq!(
            config.cursor_path("w"),
            PathBuf::from("/tmp/cw/w/cursor.json")
        );
    }
}
