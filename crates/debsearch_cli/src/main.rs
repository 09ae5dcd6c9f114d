//! `debsearch` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and environment.
//! - Run one load or search against the configured database and report it.

use clap::{Args, Parser, Subcommand, ValueEnum};
use debsearch_core::db::open_db;
use debsearch_core::model::catalog::{DEFAULT_ARCH, DEFAULT_MIRROR, DEFAULT_RELEASE};
use debsearch_core::{
    contents_url, default_log_level, init_logging, load_contents, load_packages, search_files,
    search_packages, AutoSource, LoadReport, ParsePolicy, SearchQuery, SourceCatalog,
};
use log::error;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Load Ubuntu archive metadata into SQLite full-text tables and search it.
#[derive(Parser, Debug)]
#[command(name = "debsearch", version, about, long_about = None)]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "DATABASE_FILE", default_value = "database.sqlite3", global = true)]
    database: PathBuf,

    /// trace|debug|info|warn|error; defaults to debug in debug builds, info otherwise.
    #[arg(long, env = "DEBSEARCH_LOG", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logs go to stderr when unset.
    #[arg(long, env = "DEBSEARCH_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the `packages` table with every archive section's Packages index.
    LoadPackages {
        #[command(flatten)]
        archive: ArchiveArgs,
        #[arg(long, value_enum, default_value_t = PolicyArg::Lenient)]
        policy: PolicyArg,
    },
    /// Replace the `contents` table with the archive's Contents index.
    LoadContents {
        #[command(flatten)]
        archive: ArchiveArgs,
        /// Explicit Contents URL or file path, overriding the archive layout.
        #[arg(long)]
        url: Option<String>,
        #[arg(long, value_enum, default_value_t = PolicyArg::Lenient)]
        policy: PolicyArg,
    },
    /// Search package names.
    SearchPackages(SearchArgs),
    /// Search file paths.
    SearchFiles(SearchArgs),
}

#[derive(Args, Debug)]
struct ArchiveArgs {
    #[arg(long, default_value = DEFAULT_MIRROR)]
    mirror: String,
    #[arg(long, default_value = DEFAULT_RELEASE)]
    release: String,
    #[arg(long, default_value = DEFAULT_ARCH)]
    arch: String,
}

#[derive(Args, Debug)]
struct SearchArgs {
    query: String,
    #[arg(long, default_value_t = debsearch_core::search::fts::DEFAULT_SEARCH_LIMIT)]
    limit: u32,
    /// Pass the query to FTS5 unescaped.
    #[arg(long)]
    raw: bool,
    /// Print hits as JSON lines.
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    Lenient,
    Strict,
}

impl From<PolicyArg> for ParsePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Lenient => ParsePolicy::Lenient,
            PolicyArg::Strict => ParsePolicy::Strict,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut conn = open_db(&cli.database)?;
    let source = AutoSource::default();

    match cli.command {
        Commands::LoadPackages { archive, policy } => {
            let catalog = SourceCatalog::ubuntu(&archive.mirror, &archive.release, &archive.arch);
            let report = load_packages(&mut conn, &catalog, &source, policy.into())?;
            print_report(&report);
        }
        Commands::LoadContents {
            archive,
            url,
            policy,
        } => {
            let url = url.unwrap_or_else(|| {
                contents_url(&archive.mirror, &archive.release, &archive.arch)
            });
            let report = load_contents(&mut conn, &url, &source, policy.into())?;
            print_report(&report);
        }
        Commands::SearchPackages(args) => {
            for hit in search_packages(&conn, &search_query(&args))? {
                if args.json {
                    println!("{}", serde_json::to_string(&hit)?);
                } else {
                    println!(
                        "{} {} [{}] - {}",
                        hit.name,
                        hit.version,
                        hit.source.as_deref().unwrap_or("-"),
                        hit.description
                    );
                }
            }
        }
        Commands::SearchFiles(args) => {
            for hit in search_files(&conn, &search_query(&args))? {
                if args.json {
                    println!("{}", serde_json::to_string(&hit)?);
                } else {
                    println!("{}\t{}", hit.filename, hit.package);
                }
            }
        }
    }

    Ok(())
}

fn search_query(args: &SearchArgs) -> SearchQuery {
    let mut query = SearchQuery::new(args.query.as_str());
    query.limit = args.limit;
    query.raw_fts_syntax = args.raw;
    query
}

fn print_report(report: &LoadReport) {
    for section in &report.sections {
        println!("{}: {} rows from {}", section.label, section.rows, section.url);
    }
    if report.malformed_lines > 0 || report.dropped_records > 0 {
        println!(
            "skipped {} malformed lines, dropped {} incomplete records",
            report.malformed_lines, report.dropped_records
        );
    }
    println!("Wrote {} rows to `{}`.", report.rows_written, report.table);
}
