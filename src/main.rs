use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_channel_manager::{
    config::{ConfigLoader, ConfigOverrides, DispatcharrOverrides, ManagerConfig, ScanOverrides},
    engine::{DuplicateStrategy, NameSource},
    models::ScanMode,
    report::{self, CsvReportWriter, JsonResultsStore},
    rules::RuleParser,
    scheduler::{ScanJob, ScanScheduler},
    services::ScanOrchestrator,
    sources::{DispatcharrClient, InMemoryChannelStore},
    utils::time::{parse_scheduled_times, resolve_timezone},
};

#[derive(Parser)]
#[command(name = "event-channel-manager")]
#[command(version)]
#[command(about = "Hide Dispatcharr event channels that have no live or upcoming event")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Use a JSON channel snapshot instead of the Dispatcharr API
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Settings that take precedence over the config file and environment
#[derive(Args)]
struct OverrideArgs {
    /// Channel profile names, comma separated
    #[arg(long = "profile", value_name = "NAMES")]
    profile_names: Option<String>,

    /// Channel group names, comma separated
    #[arg(long = "groups", value_name = "NAMES")]
    channel_groups: Option<String>,

    /// Hide rules, e.g. "[BlankName],[PastDate:0:4h]"
    #[arg(long = "rules", value_name = "RULES")]
    hide_rules: Option<String>,

    /// IANA timezone name
    #[arg(long, value_name = "TZ")]
    timezone: Option<String>,

    /// Dispatcharr base URL
    #[arg(long, value_name = "URL")]
    dispatcharr_url: Option<String>,

    /// Keep duplicate event channels visible
    #[arg(long)]
    keep_duplicates: Option<bool>,

    /// Which duplicate to keep: lowest_number, highest_number, longest_name
    #[arg(long, value_parser = DuplicateStrategy::from_str)]
    duplicate_strategy: Option<DuplicateStrategy>,

    /// Name to evaluate: channel_name or stream_name
    #[arg(long, value_parser = NameSource::from_str)]
    name_source: Option<NameSource>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            dispatcharr: DispatcharrOverrides {
                url: args.dispatcharr_url,
            },
            scan: ScanOverrides {
                profile_names: args.profile_names,
                channel_groups: args.channel_groups,
                hide_rules: args.hide_rules,
                timezone: args.timezone,
                duplicate_strategy: args.duplicate_strategy,
                keep_duplicates: args.keep_duplicates,
                name_source: args.name_source,
            },
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate channels and report what would change
    DryRun,
    /// Evaluate channels and apply visibility changes
    Run,
    /// Clear EPG data from hidden channels
    RemoveEpg,
    /// Delete exported CSV reports
    ClearExports,
    /// Parse a hide rule string and print the result
    CheckRules {
        /// Rule string; defaults to the configured rules
        rules: Option<String>,
    },
    /// Run scans at the configured times until interrupted
    Schedule,
}

enum Backend {
    Api(Arc<DispatcharrClient>),
    Snapshot(Arc<InMemoryChannelStore>, PathBuf),
}

impl Backend {
    async fn connect(config: &ManagerConfig, snapshot: Option<&Path>) -> Result<Self> {
        match snapshot {
            Some(path) => {
                let store = InMemoryChannelStore::load_json(path)
                    .await
                    .with_context(|| format!("loading snapshot {}", path.display()))?;
                Ok(Self::Snapshot(Arc::new(store), path.to_path_buf()))
            }
            None => {
                let client = DispatcharrClient::new(&config.dispatcharr)
                    .context("configuring the Dispatcharr client")?;
                info!("Using Dispatcharr at {}", config.dispatcharr.url);
                Ok(Self::Api(Arc::new(client)))
            }
        }
    }

    fn orchestrator(&self, config: &ManagerConfig) -> ScanOrchestrator {
        let orchestrator = match self {
            Self::Api(client) => ScanOrchestrator::new(client.clone(), client.clone()),
            Self::Snapshot(store, _) => ScanOrchestrator::new(store.clone(), store.clone()),
        };
        orchestrator
            .with_report_sink(Arc::new(CsvReportWriter::new(&config.storage.export_dir)))
            .with_report_sink(Arc::new(JsonResultsStore::new(&config.storage.results_file)))
    }

    /// Write snapshot changes back to disk
    async fn persist(&self) -> Result<()> {
        if let Self::Snapshot(store, path) = self {
            store
                .save_json(path)
                .await
                .with_context(|| format!("saving snapshot {}", path.display()))?;
            info!("Snapshot saved to {}", path.display());
        }
        Ok(())
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let log_filter = format!("event_channel_manager={}", level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    info!("Starting event channel manager v{}", env!("CARGO_PKG_VERSION"));

    let loader = ConfigLoader::new(&cli.config, cli.overrides.into());
    let config = loader.load().context("loading configuration")?;
    info!("Configuration loaded from: {}", cli.config.display());

    match cli.command {
        Command::CheckRules { rules } => {
            let input = rules.unwrap_or_else(|| config.scan.hide_rules.clone());
            let parsed = RuleParser::new().parse(&input);
            if parsed.used_defaults {
                println!("No rules given, using the default rule list");
            }
            for rule in &parsed.rules {
                println!("{}", rule);
            }
            for warning in &parsed.warnings {
                println!("warning: {}", warning);
            }
            if parsed.is_empty() {
                anyhow::bail!("no valid hide rules in '{}'", input);
            }
        }
        Command::ClearExports => {
            let deleted = report::clear_exports(&config.storage.export_dir).await?;
            for name in &deleted {
                println!("{}", name);
            }
            println!("Deleted {} export file(s)", deleted.len());
        }
        Command::DryRun => {
            let backend = Backend::connect(&config, cli.snapshot.as_deref()).await?;
            let result = backend
                .orchestrator(&config)
                .scan(&config.scan, ScanMode::DryRun)
                .await?;
            println!("{}", result.summary_message());
        }
        Command::Run => {
            let backend = Backend::connect(&config, cli.snapshot.as_deref()).await?;
            let result = backend
                .orchestrator(&config)
                .scan(&config.scan, ScanMode::Apply)
                .await?;
            backend.persist().await?;
            println!("{}", result.summary_message());
        }
        Command::RemoveEpg => {
            let backend = Backend::connect(&config, cli.snapshot.as_deref()).await?;
            let entries = backend
                .orchestrator(&config)
                .remove_epg_from_hidden(&config.scan)
                .await?;
            backend.persist().await?;
            println!("Processed {} hidden channel(s)", entries.len());
        }
        Command::Schedule => {
            let backend = Backend::connect(&config, cli.snapshot.as_deref()).await?;
            let orchestrator = Arc::new(backend.orchestrator(&config));
            let times = parse_scheduled_times(&config.schedule.scheduled_times);
            let tz = resolve_timezone(&config.scan.timezone);

            let mut scheduler = ScanScheduler::from_config(&config.schedule);
            let job = Arc::new(ScanJob::new(orchestrator, loader.clone()));
            if !scheduler.start(times, tz, job) {
                warn!("Nothing to schedule; set schedule.scheduled_times (e.g. \"0600,1800\")");
                return Ok(());
            }

            tokio::signal::ctrl_c()
                .await
                .context("waiting for shutdown signal")?;
            info!("Shutdown requested");
            scheduler.stop().await;
            backend.persist().await?;
        }
    }

    Ok(())
}
