//! CLI entry point for the movie listing importer.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use movie_ingest::{Importer, IngestConfig, ListingSource, PreparedDataset, SqliteStore};
use std::env;
use tracing::info;

/// Environment variable consulted when `--database` is not given.
const DATABASE_ENV: &str = "MOVIE_INGEST_DATABASE";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Movie listing importer",
    long_about = "Cleans a movie listing CSV export and reconciles it into a normalized \
                  SQLite catalog of movies, genres, directors and actors.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  MOVIE_INGEST_DATABASE    Catalog database used when --database is omitted\n\n\
                  EXAMPLES:\n  \
                  # Import into a fresh database\n  \
                  movie-ingest -i data/movies.csv -d movies.db --init-schema\n\n  \
                  # Preview the cleaned rows without touching the database\n  \
                  movie-ingest -i data/movies.csv --dry-run"
)]
struct Args {
    /// Path to the CSV export to import
    #[arg(short, long, default_value = "data/movies.csv")]
    input: String,

    /// SQLite catalog database
    ///
    /// Falls back to $MOVIE_INGEST_DATABASE, then "movies.db"
    #[arg(short, long)]
    database: Option<String>,

    /// Create missing catalog tables before importing
    #[arg(long)]
    init_schema: bool,

    /// Maximum number of actors linked per movie
    #[arg(long, default_value = "20")]
    actor_limit: usize,

    /// Run the cleaning stage only and preview the cleaned rows
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    dotenv().ok();

    let database = args
        .database
        .clone()
        .or_else(|| env::var(DATABASE_ENV).ok())
        .unwrap_or_else(|| "movies.db".to_string());

    let config = IngestConfig::builder()
        .source_path(&args.input)
        .database_path(database)
        .actor_limit(args.actor_limit)
        .bootstrap_schema(args.init_schema)
        .build()?;

    if args.dry_run {
        return run_dry_run(config);
    }

    info!("Opening catalog at: {}", config.database_path.display());
    let mut store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("opening database {}", config.database_path.display())
    })?;

    if config.bootstrap_schema {
        store.bootstrap_schema()?;
        info!("Catalog schema ready");
    }

    let importer = Importer::builder().config(config).build()?;
    let summary = importer.run(&mut store)?;

    println!("{summary}");
    Ok(())
}

/// Run the cleaning stage only and print what would be imported.
///
/// Uses `println!` since the preview is the command's output, independent of
/// the log level.
fn run_dry_run(config: IngestConfig) -> Result<()> {
    let source = ListingSource::new(&config.source_path);
    let data = source.load()?;
    let importer = Importer::builder().config(config).build()?;
    let prepared = importer.prepare(data)?;

    print_preview(source.path().display().to_string(), &prepared);
    Ok(())
}

fn print_preview(path: String, prepared: &PreparedDataset) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaned listing");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", path);
    println!("  Rows read: {}", prepared.rows_before);
    println!("  Duplicates removed: {}", prepared.duplicates_removed);
    println!("  Rows to import: {}", prepared.records.len());
    println!();

    println!("RECORDS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<32} {:<6} {:<6} {:<20} {:<8}",
        "Title", "Start", "Rating", "Director", "Actors"
    );
    println!("{}", "-".repeat(76));

    for record in prepared.records.iter().take(20) {
        let directors = record.directors();
        println!(
            "{:<32} {:<6} {:<6} {:<20} {:<8}",
            truncate_str(record.title.as_deref().unwrap_or("<missing>"), 31),
            record
                .start_year
                .filter(|year| *year != 0)
                .map(|year| year.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record
                .rating
                .map(|rating| format!("{rating:.1}"))
                .unwrap_or_else(|| "-".to_string()),
            truncate_str(directors.first().map(String::as_str).unwrap_or("-"), 19),
            record.actors().len()
        );
    }
    if prepared.records.len() > 20 {
        println!("  ... {} more rows", prepared.records.len() - 20);
    }
    println!();
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
