//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use marketscope_core::{Capabilities, Pipeline, ProgressReporter, RunOutcome, RunPhase};
use marketscope_crawler::HttpFetcher;
use marketscope_discovery::{SearchClient, StoreDirectory};
use marketscope_inference::OpenRouterClient;
use marketscope_shared::{
    AppConfig, MarketReport, PipelineConfig, RecordId, StepRecord, StepStatus, init_config,
    load_config, validate_api_key,
};
use marketscope_storage::{DEFAULT_LIST_LIMIT, Storage};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MarketScope: competitor, review, trend and web research from one query.
#[derive(Parser)]
#[command(
    name = "marketscope",
    version,
    about = "Turn a market query into a structured competitor and trend report.",
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
    /// Research a query and save the report.
    Run {
        /// Natural-language query, e.g. "app for music streaming".
        query: String,

        /// Correlation id for the run (defaults to a fresh UUID v7).
        #[arg(long)]
        thread_id: Option<String>,

        /// User the report belongs to.
        #[arg(long)]
        user: Option<String>,

        /// Country code for trend discovery (overrides config).
        #[arg(long)]
        country: Option<String>,

        /// Stop waiting for the run after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,

        /// Report database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Browse saved reports.
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Report subcommands.
#[derive(Subcommand)]
pub(crate) enum ReportsAction {
    /// List saved reports, newest first.
    List {
        /// Only show reports for this user.
        #[arg(long)]
        user: Option<String>,

        /// Maximum number of reports to show.
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,

        /// Report database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print one report as JSON, by record id or thread id.
    Show {
        id: String,

        /// Report database path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
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
        0 => "marketscope=info",
        1 => "marketscope=debug",
        _ => "marketscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            query,
            thread_id,
            user,
            country,
            timeout_secs,
            json,
            db,
        } => {
            cmd_run(RunArgs {
                query,
                thread_id,
                user,
                country,
                timeout_secs,
                json,
                db,
            })
            .await
        }
        Command::Reports { action } => match action {
            ReportsAction::List { user, limit, db } => cmd_reports_list(user.as_deref(), limit, db).await,
            ReportsAction::Show { id, db } => cmd_reports_show(&id, db).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

struct RunArgs {
    query: String,
    thread_id: Option<String>,
    user: Option<String>,
    country: Option<String>,
    timeout_secs: Option<u64>,
    json: bool,
    db: Option<PathBuf>,
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    validate_api_key(&config)?;

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(country) = &args.country {
        pipeline_config.trends_country = country.trim().to_uppercase();
    }

    let caps = Capabilities::new(
        Arc::new(OpenRouterClient::from_config(&config.openrouter)?),
        Arc::new(HttpFetcher::new(&config.fetch)?),
        Arc::new(SearchClient::new(&config.search)?),
        Arc::new(StoreDirectory::new(&config.stores)?),
    );
    let db_path = resolve_db_path(&config, args.db)?;
    let storage = Arc::new(Storage::open(&db_path).await?);
    let pipeline = Pipeline::new(caps, storage, pipeline_config);

    info!(
        query = %args.query,
        model = %config.openrouter.default_model,
        db = %db_path.display(),
        "starting research"
    );

    let reporter = CliProgress::new();
    let run = pipeline.run(&args.query, args.thread_id.as_deref(), args.user, &reporter);

    let result: Result<RunOutcome> = match args.timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(eyre!("research run did not finish within {secs}s")),
        },
        None => run.await.map_err(Into::into),
    };
    let outcome = result.inspect_err(|_| reporter.spinner.finish_and_clear())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    let report = &outcome.report;

    println!();
    println!("  Research report saved!");
    println!("  Record:      {}", outcome.record_id);
    println!("  Thread:      {}", report.query.thread_id);
    println!("  Query:       {}", report.query.text);
    println!("  Competitors: {}", report.competitors.names().join(", "));
    if let Some(error) = &report.competitor_error {
        println!("               ({error})");
    }
    println!("  Reviews:     {} competitor(s)", report.reviews.len());
    println!(
        "  Trends:      {} top, {} rising",
        report.trends.top.len(),
        report.trends.rising.len()
    );
    println!(
        "  Pages:       {} analyzed, {} failed",
        report.insights.iter().filter(|i| i.success).count(),
        report.insights.iter().filter(|i| !i.success).count()
    );
    println!("  Time:        {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
    println!("  Steps:");
    for record in report.ledger.records() {
        println!("    {}", step_line(record));
    }
    println!();

    match &report.summary {
        Some(summary) => {
            println!("{summary}");
            println!();
        }
        None => println!("  (no narrative summary)\n"),
    }
}

fn step_line(record: &StepRecord) -> String {
    let status = match &record.status {
        StepStatus::Succeeded => "ok".to_string(),
        StepStatus::Degraded => format!("degraded ({} note(s))", record.diagnostics.len()),
        StepStatus::Failed { reason } => format!("failed: {reason}"),
        StepStatus::Skipped { reason } => format!("skipped: {reason}"),
    };
    format!("{:<22} {:>6} ms  {status}", record.step.as_str(), record.elapsed_ms)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, phase: RunPhase) {
        self.spinner.set_message(phase.label());
    }

    fn step_finished(&self, record: &StepRecord) {
        self.spinner.println(format!("  {}", step_line(record)));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// reports
// ---------------------------------------------------------------------------

async fn cmd_reports_list(user: Option<&str>, limit: u32, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let storage = open_readonly(&resolve_db_path(&config, db)?).await?;

    let reports = storage.list_reports(user, limit).await?;
    if reports.is_empty() {
        println!("No reports saved yet.");
        return Ok(());
    }

    for r in reports {
        println!(
            "{}  {}  {:<12}  degraded={}  {}",
            r.id,
            r.created_at,
            r.user_id.as_deref().unwrap_or("-"),
            r.degraded_steps,
            r.query
        );
    }
    Ok(())
}

async fn cmd_reports_show(id: &str, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let storage = open_readonly(&resolve_db_path(&config, db)?).await?;

    let stored = match id.parse::<RecordId>() {
        Ok(record_id) => storage.get_report(record_id).await?,
        Err(_) => storage.get_report_by_thread(id).await?,
    };
    let stored = stored.ok_or_else(|| eyre!("no report with record or thread id '{id}'"))?;

    let report: &MarketReport = &stored.report;
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

async fn open_readonly(path: &Path) -> Result<Storage> {
    Ok(Storage::open_readonly(path).await?)
}

fn resolve_db_path(config: &AppConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path),
        None => Ok(config.storage.resolved_db_path()?),
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
