//! CLI command definitions, routing, and tracing setup.

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use dexrefresh_core::{RefreshProgress, RefreshReport, Refresher};
use dexrefresh_fetcher::HttpAbilityFetcher;
use dexrefresh_records::CsvRecordSource;
use dexrefresh_shared::{AppConfig, RefreshConfig, init_config, load_config};
use dexrefresh_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dexrefresh: keep a local creature cache in sync with its record file.
#[derive(Parser)]
#[command(
    name = "dexrefresh",
    version,
    about = "Refresh a local creature cache from a record file and the abilities it references.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Read, enrich and save every creature record.
    Refresh {
        /// Number of segments and enrichment workers.
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        workers: Option<u16>,

        /// Record file to read (overrides `source.path`).
        #[arg(long)]
        source: Option<String>,

        /// Cache database to write (overrides `cache.path`).
        #[arg(long)]
        cache: Option<String>,
    },

    /// List the creatures saved by the latest refresh.
    List {
        /// Cache database to read (overrides `cache.path`).
        #[arg(long)]
        cache: Option<String>,
    },

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
        0 => "dexrefresh=info",
        1 => "dexrefresh=debug",
        _ => "dexrefresh=trace",
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
        Command::Refresh {
            workers,
            source,
            cache,
        } => {
            let mut config = load_config()?;
            apply_overrides(&mut config, workers, source, cache);
            cmd_refresh(&config).await
        }
        Command::List { cache } => {
            let mut config = load_config()?;
            apply_overrides(&mut config, None, None, cache);
            cmd_list(&config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Layer CLI flags over the loaded config.
fn apply_overrides(
    config: &mut AppConfig,
    workers: Option<u16>,
    source: Option<String>,
    cache: Option<String>,
) {
    if let Some(workers) = workers {
        config.pipeline.worker_count = usize::from(workers);
    }
    if let Some(source) = source {
        config.source.path = source;
    }
    if let Some(cache) = cache {
        config.cache.path = cache;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_refresh(config: &AppConfig) -> Result<()> {
    let refresh_config = RefreshConfig::from(config);

    let source = CsvRecordSource::new(&config.source.path, refresh_config.worker_count);
    let fetcher = HttpAbilityFetcher::new(&config.fetch)?;
    let storage = Storage::open(Path::new(&config.cache.path))
        .await
        .wrap_err_with(|| format!("opening cache {}", config.cache.path))?;

    info!(
        source = %config.source.path,
        cache = %config.cache.path,
        workers = refresh_config.worker_count,
        "starting refresh"
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling refresh");
            on_interrupt.cancel();
        }
    });

    let refresher = Refresher::new(
        Arc::new(source),
        Arc::new(fetcher),
        Arc::new(storage),
        refresh_config,
    );

    let reporter = CliProgress::new();
    let outcome = refresher.refresh_with_progress(&cancel, &reporter).await;
    reporter.spinner.finish_and_clear();
    let report = outcome?;

    println!();
    println!("  Cache refreshed!");
    println!("  Creatures: {}", report.creatures);
    println!("  Segments:  {}", report.segments);
    println!("  Cache:     {}", config.cache.path);
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let storage = Storage::open(Path::new(&config.cache.path))
        .await
        .wrap_err_with(|| format!("opening cache {}", config.cache.path))?;

    let Some(run) = storage.last_refresh().await? else {
        println!("No refresh recorded in {}", config.cache.path);
        return Ok(());
    };

    let creatures = storage.list_creatures().await?;
    info!(count = creatures.len(), "listing cached creatures");

    println!(
        "{:>5}  {:<16} {:>6} {:>7}  {:>7}",
        "ID", "NAME", "HEIGHT", "WEIGHT", "EFFECTS"
    );
    for creature in &creatures {
        println!(
            "{:>5}  {:<16} {:>6} {:>7}  {:>7}",
            creature.id,
            creature.name,
            creature.height,
            creature.weight,
            creature.effect_entries.len()
        );
    }
    println!();
    println!(
        "  {} creatures, refreshed {}",
        run.creature_count,
        run.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner reporting refresh phases and the running creature count.
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
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl RefreshProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn creature_collected(&self, collected: usize) {
        self.spinner
            .set_message(format!("Enriching abilities [{collected} done]"));
    }

    fn done(&self, _report: &RefreshReport) {
        self.spinner.finish_and_clear();
    }
}
