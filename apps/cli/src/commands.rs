//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use jobsift_core::{RunConfig, RunProgress, RunSummary, Source, run_ingestion};
use jobsift_shared::{AppConfig, expand_home, init_config, load_config};
use jobsift_storage::{DistinctColumn, RecordFilter, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Jobsift — structured job postings out of chat-channel noise.
#[derive(Parser)]
#[command(
    name = "jobsift",
    version,
    about = "Extract, structure, and deduplicate job postings from exported chat channels.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Ingest all enabled sources and print the run summary.
    Run {
        /// Process only the named source (may be repeated).
        #[arg(long)]
        source: Vec<String>,
    },

    /// List stored job records.
    List {
        /// Substring match on job type (Remote, Hybrid, On-site).
        #[arg(long)]
        job_type: Option<String>,

        /// Substring match on location.
        #[arg(long)]
        location: Option<String>,

        /// Substring match on company name.
        #[arg(long)]
        company: Option<String>,

        /// Exact source name.
        #[arg(long)]
        source: Option<String>,

        /// Substring search across role, company, and description.
        #[arg(long)]
        search: Option<String>,

        /// Only postings dated at or after this ISO timestamp.
        #[arg(long)]
        after: Option<String>,

        /// Only postings dated at or before this ISO timestamp.
        #[arg(long)]
        before: Option<String>,

        /// Page number (1-based).
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Records per page.
        #[arg(long, default_value_t = 20)]
        page_size: u32,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show database statistics.
    Stats,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "jobsift=info",
        1 => "jobsift=debug",
        _ => "jobsift=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { source } => cmd_run(source).await,
        Command::List {
            job_type,
            location,
            company,
            source,
            search,
            after,
            before,
            page,
            page_size,
            json,
        } => {
            let filter = RecordFilter {
                job_type,
                location,
                company,
                source,
                search,
                posted_after: after,
                posted_before: before,
                page,
                page_size,
            };
            cmd_list(filter, json).await
        }
        Command::Stats => cmd_stats().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(only: Vec<String>) -> Result<()> {
    let config = load_config()?;

    let sources: Vec<Source> = config
        .sources
        .iter()
        .filter(|s| s.enabled)
        .filter(|s| only.is_empty() || only.iter().any(|name| name == &s.name))
        .map(|s| Source::export_file(&s.name, expand_home(&s.path)))
        .collect();

    if sources.is_empty() {
        return Err(eyre!(
            "no sources to process. Register exports under [[sources]] in {}",
            jobsift_shared::config_file_path()?.display()
        ));
    }

    info!(sources = sources.len(), "starting ingestion run");

    let run_config = RunConfig::from(&config);
    let progress = CliProgress::new();
    let summary = run_ingestion(&run_config, &sources, &progress).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\nRun summary");
    println!("{:-<68}", "");
    for stats in &summary.sources {
        match &stats.error {
            Some(error) => println!("  {:<28} FAILED: {error}", stats.source),
            None => println!(
                "  {:<28} processed {:>4}  candidates {:>4}  inserted {:>4}  duplicate {:>4}  rejected {:>4}",
                stats.source,
                stats.processed,
                stats.candidates,
                stats.inserted,
                stats.duplicates,
                stats.rejected
            ),
        }
    }
    println!("{:-<68}", "");
    println!(
        "  total: processed {}, candidates {}, inserted {}, duplicate {}, rejected {}",
        summary.processed(),
        summary.candidates(),
        summary.inserted(),
        summary.duplicates(),
        summary.rejected()
    );
    println!(
        "  duplicate links created: {}, records in database: {}",
        summary.duplicate_links, summary.total_records
    );
}

// ---------------------------------------------------------------------------
// list / stats
// ---------------------------------------------------------------------------

async fn open_database_readonly() -> Result<Storage> {
    let config = load_config()?;
    let path = expand_home(&config.defaults.database_path);
    if !path.exists() {
        return Err(eyre!(
            "no database at {} — run `jobsift run` first",
            path.display()
        ));
    }
    Ok(Storage::open_readonly(&path).await?)
}

async fn cmd_list(filter: RecordFilter, json: bool) -> Result<()> {
    let storage = open_database_readonly().await?;
    let page = storage.list_records(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page.records)?);
        return Ok(());
    }

    if page.records.is_empty() {
        println!("No records match.");
        return Ok(());
    }

    for record in &page.records {
        let job_type = record.job_type.as_deref().unwrap_or("-");
        println!(
            "{} — {} ({}) [{}]",
            record.role, record.company_name, record.location, job_type
        );
        println!(
            "    posted: {}  source: {}  apply: {}",
            record.date_posted,
            record.source,
            record.application_link.as_deref().unwrap_or("-")
        );
    }
    println!(
        "\npage {}/{} · {} record(s) total",
        page.page,
        page.total_pages.max(1),
        page.total
    );
    Ok(())
}

async fn cmd_stats() -> Result<()> {
    let storage = open_database_readonly().await?;

    let total = storage.count_records().await?;
    let sources = storage.distinct_values(DistinctColumn::Source).await?;
    let companies = storage.distinct_values(DistinctColumn::Company).await?;
    let locations = storage.distinct_values(DistinctColumn::Location).await?;
    let links = storage.list_duplicate_links().await?;

    println!("Records:         {total}");
    println!("Companies:       {}", companies.len());
    println!("Locations:       {}", locations.len());
    println!("Duplicate links: {}", links.len());
    println!("Sources:");
    for source in sources {
        println!("  - {source}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress bar
// ---------------------------------------------------------------------------

/// Spinner-based progress for interactive runs.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("valid progress template"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }
}

impl RunProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn source_started(&self, name: &str, messages: usize) {
        self.bar.println(format!("{name}: {messages} message(s) to structure"));
    }

    fn message_processed(&self, source: &str, current: usize, total: usize) {
        self.bar.set_message(format!("{source}: {current}/{total}"));
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}
