// BEL Analytics - command line
// Leaderboard, summaries, account detail, CSV export and validation over one dataset snapshot

use anyhow::{bail, Context, Result};
use bel_analytics::config::{parse_date, AppConfig};
use bel_analytics::export;
use bel_analytics::pipeline::QueryParams;
use bel_analytics::{logging, DataStore, LeaderboardQuery, Pipeline};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "bel-analytics")]
#[command(about = "BEL referral performance: leaderboard, summaries and exports", version)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset path (overrides config and BEL_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Reference date for the cutoff policy, YYYY-MM-DD
    #[arg(long, global = true)]
    reference_date: Option<String>,

    /// Log level for our crates (RUST_LOG still wins)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Filtered, sorted, paginated leaderboard
    Leaderboard {
        #[command(flatten)]
        query: QueryArgs,

        /// Zero-based page index; out-of-range values clamp
        #[arg(long, default_value = "0")]
        page: usize,

        #[arg(long)]
        page_size: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Dashboard totals plus per-level and per-region breakdowns
    Summary {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long)]
        json: bool,
    },
    /// One BEL with its monthly breakdown
    Account {
        id: String,

        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        json: bool,
    },
    /// Write the full filtered, sorted result as CSV
    Export {
        #[command(flatten)]
        query: QueryArgs,

        /// File or directory; defaults to a generated name in the current directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Load the dataset and report record issues
    Validate,
    /// Interactive terminal browser
    Tui,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Year the metrics are computed for
    #[arg(long)]
    year: Option<i32>,

    /// Active months (0-12), overriding the reference date
    #[arg(long)]
    cutoff: Option<usize>,

    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    level: Option<String>,

    /// Only BELs with recorded data for this year
    #[arg(long)]
    data_year: Option<i32>,

    /// Name contains (case-insensitive)
    #[arg(long)]
    keyword: Option<String>,

    /// Referral id contains (case-insensitive)
    #[arg(long)]
    referral_id: Option<String>,

    /// Two-letter country code
    #[arg(long)]
    country: Option<String>,

    /// clicks_only | with_orders | inactive
    #[arg(long)]
    activity: Option<String>,

    #[arg(long)]
    sort: Option<String>,

    /// asc | desc
    #[arg(long)]
    direction: Option<String>,
}

impl From<QueryArgs> for QueryParams {
    fn from(args: QueryArgs) -> Self {
        QueryParams {
            year: args.year,
            cutoff: args.cutoff,
            region: args.region,
            level: args.level,
            data_year: args.data_year,
            keyword: args.keyword,
            referral_id: args.referral_id,
            country: args.country,
            activity: args.activity,
            sort: args.sort,
            direction: args.direction,
        }
    }
}

struct Session {
    config: AppConfig,
    reference: NaiveDate,
    pipeline: Arc<Pipeline>,
}

impl Session {
    fn query(&self, args: QueryArgs) -> Result<LeaderboardQuery> {
        let default_year = self.pipeline.default_year(self.reference);
        QueryParams::from(args)
            .resolve(self.reference, default_year)
            .map_err(anyhow::Error::msg)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }
    if let Some(date) = cli.reference_date.as_deref() {
        config.reference_date = Some(parse_date("--reference-date", date)?);
    }
    if let Some(level) = cli.log_level {
        config.log_level = Some(level);
    }

    let command = cli.command.unwrap_or(Command::Tui);
    if matches!(command, Command::Tui) {
        logging::init_for_tui();
    } else {
        logging::init(config.log_level.as_deref());
    }

    let store = DataStore::load(&config.data_path)
        .with_context(|| format!("Failed to load dataset {}", config.data_path.display()))?;
    let reference = config.reference_date();
    info!(bels = store.len(), %reference, "snapshot ready");

    let ctx = Session {
        reference,
        pipeline: Arc::new(Pipeline::new(Arc::new(store))),
        config,
    };

    match command {
        Command::Leaderboard { query, page, page_size, json } => run_leaderboard(&ctx, query, page, page_size, json),
        Command::Summary { query, json } => run_summary(&ctx, query, json),
        Command::Account { id, year, json } => run_account(&ctx, &id, year, json),
        Command::Export { query, output } => run_export(&ctx, query, output),
        Command::Validate => run_validate(&ctx),
        Command::Tui => run_tui(&ctx),
    }
}

fn run_leaderboard(ctx: &Session, args: QueryArgs, page: usize, page_size: Option<usize>, json: bool) -> Result<()> {
    let query = ctx.query(args)?;
    let page_size = page_size.unwrap_or(ctx.config.default_page_size);
    let page = ctx.pipeline.page(&query, page_size, page);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!(
        "🏆 BEL Leaderboard {} (months 1-{}), sorted by {} {}",
        query.year,
        query.cutoff_month_index,
        query.sort_key.label(),
        query.direction.as_str()
    );
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<12} {:<24} {:<9} {:>8} {:>7} {:>12} {:>7} {:>9}  {}",
        "Referral ID", "Name", "Level", "Clicks", "Orders", "Revenue", "CVR %", "AOV", "Region"
    );
    for row in &page.items {
        let m = &row.metrics;
        println!(
            "{:<12} {:<24} {:<9} {:>8} {:>7} {:>12.2} {:>7.2} {:>9.2}  {}",
            row.id,
            row.short_name(24),
            row.level.as_str(),
            m.clicks,
            m.orders,
            m.revenue,
            m.cvr,
            m.aov,
            row.region
        );
    }
    println!(
        "\nPage {}/{} · showing {}-{} of {}",
        if page.total_pages == 0 { 0 } else { page.page_index + 1 },
        page.total_pages,
        page.from,
        page.to,
        page.total_items
    );
    Ok(())
}

fn run_summary(ctx: &Session, args: QueryArgs, json: bool) -> Result<()> {
    let query = ctx.query(args)?;
    let summary = ctx.pipeline.summary(&query);
    let levels = ctx.pipeline.level_breakdown(&query);
    let regions = ctx.pipeline.region_breakdown(&query);

    if json {
        let body = serde_json::json!({
            "summary": summary,
            "by_level": levels,
            "by_region": regions,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let m = summary.metrics;
    println!("📊 Dashboard {} (months 1-{})", summary.year, summary.cutoff_month_index);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("BELs:     {}", summary.bel_count);
    println!("Clicks:   {}", m.clicks);
    println!("Orders:   {}", m.orders);
    println!("Revenue:  {:.2}", m.revenue);
    println!("C2O CVR:  {:.2}%", m.cvr);
    println!("AOV:      {:.2}", m.aov);

    println!("\nBy level");
    for group in &levels {
        print_group(&group.key.to_string(), group.bel_count, &group.metrics);
    }
    println!("\nBy region");
    for group in &regions {
        print_group(&group.key.to_string(), group.bel_count, &group.metrics);
    }
    Ok(())
}

fn print_group(label: &str, count: usize, m: &bel_analytics::Metrics) {
    println!(
        "  {:<24} {:>4} BELs  {:>8} clicks  {:>6} orders  {:>12.2}  CVR {:>6.2}%  AOV {:>8.2}",
        label, count, m.clicks, m.orders, m.revenue, m.cvr, m.aov
    );
}

fn run_account(ctx: &Session, id: &str, year: Option<i32>, json: bool) -> Result<()> {
    let year = year.unwrap_or_else(|| ctx.pipeline.default_year(ctx.reference));
    let cutoff = bel_analytics::cutoff_month_index(year, ctx.reference);
    let Some(detail) = ctx.pipeline.account(id, year, cutoff) else {
        bail!("BEL not found: {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let row = &detail.row;
    println!("👤 {} ({})", row.name, row.id);
    println!("   {} · {} · {}", row.level, row.country, row.region);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("{:<6} {:>8} {:>7} {:>12} {:>7} {:>9}", "Month", "Clicks", "Orders", "Revenue", "CVR %", "AOV");
    for point in &detail.monthly {
        let m = point.metrics;
        println!(
            "{:<6} {:>8} {:>7} {:>12.2} {:>7.2} {:>9.2}",
            point.month.short_name(),
            m.clicks,
            m.orders,
            m.revenue,
            m.cvr,
            m.aov
        );
    }
    let m = row.metrics;
    println!(
        "{:<6} {:>8} {:>7} {:>12.2} {:>7.2} {:>9.2}",
        "YTD", m.clicks, m.orders, m.revenue, m.cvr, m.aov
    );

    for issue in &detail.issues {
        println!("⚠️  {}", issue);
    }
    Ok(())
}

fn run_export(ctx: &Session, args: QueryArgs, output: Option<PathBuf>) -> Result<()> {
    let query = ctx.query(args)?;
    let rows = ctx.pipeline.rows(&query);

    let filename = export::export_filename(&query.filter, ctx.reference);
    let path = match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path,
        None => PathBuf::from(filename),
    };

    let written = export::write_csv_file(&rows, &path)
        .with_context(|| format!("Failed to export {}", path.display()))?;
    println!("✓ Exported {} BELs to {}", written, path.display());
    Ok(())
}

fn run_validate(ctx: &Session) -> Result<()> {
    let store = ctx.pipeline.store();
    let report = store.report();

    println!("🔍 Dataset validation");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Source:       {}", ctx.config.data_path.display());
    println!("Fingerprint:  {}", store.fingerprint());
    println!("Years:        {:?}", store.years());
    println!("{}", report.summary());

    for (kind, count) in report.counts_by_kind() {
        println!("  {:<20} {}", kind.as_str(), count);
    }
    for issue in &report.issues {
        println!("  {}", issue);
    }

    if report.is_clean() {
        println!("\n✅ No issues found");
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_tui(ctx: &Session) -> Result<()> {
    let mut app = bel_analytics::ui::App::new(Arc::clone(&ctx.pipeline), ctx.reference, ctx.config.default_page_size);
    bel_analytics::ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_tui(_ctx: &Session) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin bel-server --features server");
    std::process::exit(1);
}
