//! sessionlens - session engagement and conversion reports
//!
//! Loads a delimited file of user sessions into the event store and prints
//! one or more summary tables.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::{Format, Table};
use sessionlens_core::{Config, Database, Granularity, SummaryCache};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sessionlens")]
#[command(about = "Engagement, conversion and revenue reports over user sessions")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/sessionlens/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store location: ":memory:" or a SQLite file path
    #[arg(long, global = true)]
    db: Option<String>,

    /// Delimited file of sessions to load
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    report: Report,
}

#[derive(Subcommand, Debug)]
enum Report {
    /// Whole-table totals
    Summary,
    /// Low / Medium / High engagement segments
    Segments,
    /// New vs returning sessions
    UserTypes,
    /// Per-category performance
    Categories,
    /// Conversion over time
    Timeseries {
        /// Bucket width: day, week or month
        #[arg(long)]
        granularity: Option<String>,
    },
    /// Disjoint conversion funnel
    Funnel,
    /// Activity by first-session month
    Cohorts,
    /// Run a read-only SQL statement against user_events
    Query {
        /// SQL text
        sql: String,
    },
    /// Every report above except query
    All,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    let _log_guard = sessionlens_core::logging::init(&config.logging).ok();

    let db = Arc::new(open_store(&args, &config)?);

    let tables = match &args.report {
        Report::Summary => vec![summary_table(&db)?],
        Report::Segments => vec![segments_table(&db)?],
        Report::UserTypes => vec![user_types_table(&db)?],
        Report::Categories => vec![categories_table(&db)?],
        Report::Timeseries { granularity } => {
            let granularity = granularity
                .as_deref()
                .map(Granularity::from_name)
                .unwrap_or(config.analytics.default_granularity);
            vec![timeseries_table(&db, granularity)?]
        }
        Report::Funnel => vec![funnel_table(&db)?],
        Report::Cohorts => vec![cohorts_table(&db)?],
        Report::Query { sql } => {
            let result = db
                .execute_custom_query(sql)
                .context("query failed")?;
            vec![Table::from_query(&result)]
        }
        Report::All => vec![
            summary_table(&db)?,
            segments_table(&db)?,
            user_types_table(&db)?,
            categories_table(&db)?,
            timeseries_table(&db, config.analytics.default_granularity)?,
            funnel_table(&db)?,
            cohorts_table(&db)?,
        ],
    };

    let stdout = io::stdout();
    output::render(&mut stdout.lock(), &tables, args.format)?;
    Ok(())
}

/// Open the store and make sure it holds events.
///
/// An on-disk store that is already initialized is reused unless `--csv`
/// asks for a reload; otherwise the table is recreated and loaded.
fn open_store(args: &Args, config: &Config) -> Result<Database> {
    let location = args.db.as_deref().unwrap_or(&config.data.database);
    let db = Database::open_location(location)
        .with_context(|| format!("failed to open database at {}", location))?;

    if args.csv.is_none() && db.is_initialized()? {
        tracing::info!(location, "Reusing initialized event store");
        return Ok(db);
    }

    let csv_path = args.csv.as_ref().unwrap_or(&config.data.csv_path);
    let options = config.data.load_options()?;

    db.create_schema().context("failed to create schema")?;
    let count = db
        .load_csv_with(csv_path, &options)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;
    tracing::info!(count, path = %csv_path.display(), "Loaded events");

    Ok(db)
}

fn summary_table(db: &Arc<Database>) -> Result<Table> {
    let cache = SummaryCache::new(Arc::clone(db));
    let stats = cache.get()?;
    Table::from_summary(&stats)
}

fn segments_table(db: &Database) -> Result<Table> {
    let rows = db
        .get_engagement_segmentation()
        .context("engagement segmentation failed")?;
    Table::from_rows("Engagement Segments", &rows)
}

fn user_types_table(db: &Database) -> Result<Table> {
    let rows = db
        .get_user_type_breakdown()
        .context("user type breakdown failed")?;
    Table::from_rows("User Types", &rows)
}

fn categories_table(db: &Database) -> Result<Table> {
    let rows = db
        .get_category_performance()
        .context("category performance failed")?;
    Table::from_rows("Categories", &rows)
}

fn timeseries_table(db: &Database, granularity: Granularity) -> Result<Table> {
    let rows = db
        .get_timeseries_conversion(granularity)
        .context("time series failed")?;
    Table::from_rows(&format!("Timeseries {}", granularity), &rows)
}

fn funnel_table(db: &Database) -> Result<Table> {
    let rows = db
        .get_conversion_funnel()
        .context("conversion funnel failed")?;
    Table::from_rows("Conversion Funnel", &rows)
}

fn cohorts_table(db: &Database) -> Result<Table> {
    let rows = db
        .get_cohort_analysis()
        .context("cohort analysis failed")?;
    Table::from_rows("Cohorts", &rows)
}
