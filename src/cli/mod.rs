//! Command-line interface for nodemeter.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use crate::charts::{calendar_year_bounds, ChartPeriod, ChartSeriesBuilder, SeriesRequest};
use crate::core::config::ConfigBuilder;
use crate::core::{Config, NodemeterError, Result, Role, Timestamp};
use crate::export::{to_json, ChartStatsDocument, ReportDocument};
use crate::reports::PeriodAggregator;
use crate::storage::{ingest_payload, open_store, open_store_readonly};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Time-series statistics and chart data for a companion and repeater node
#[derive(Parser, Debug)]
#[command(name = "nodemeter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/nodemeter/config.yaml)
    #[arg(short, long, global = true, env = "NODEMETER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Metric database path
    #[arg(long, global = true, env = "NODEMETER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, env = "NODEMETER_DEBUG")]
    pub debug: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store one collection payload (a JSON object of metric -> value)
    Ingest {
        /// Node role
        #[arg(long)]
        role: Role,
        /// Collection time in Unix seconds (default: now)
        #[arg(long)]
        ts: Option<Timestamp>,
        /// Payload file; stdin when omitted
        file: Option<PathBuf>,
    },
    /// Print the most recent snapshot of a role
    Latest {
        /// Node role
        #[arg(long)]
        role: Role,
    },
    /// Build one chart series
    Chart {
        /// Node role
        #[arg(long)]
        role: Role,
        /// Metric name
        #[arg(long)]
        metric: String,
        /// Chart period: day, week, month or year
        #[arg(long, default_value = "day")]
        period: ChartPeriod,
        /// Window end in Unix seconds (default: now)
        #[arg(long)]
        end: Option<Timestamp>,
        /// Stretch the x-axis over this UTC calendar year
        #[arg(long)]
        calendar_year: Option<i32>,
    },
    /// Print chart statistics for every metric and period of a role
    Charts {
        /// Node role
        #[arg(long)]
        role: Role,
        /// Window end in Unix seconds (default: now)
        #[arg(long)]
        end: Option<Timestamp>,
    },
    /// Build a monthly or yearly report
    Report {
        /// Report period
        #[command(subcommand)]
        kind: ReportKind,
    },
    /// List the months holding data for a role
    Periods {
        /// Node role
        #[arg(long)]
        role: Role,
    },
    /// Reclaim space in the metric database
    Compact,
    /// Validate configuration and exit
    CheckConfig,
}

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportKind {
    /// Statistics for one calendar month
    Monthly {
        /// Node role
        #[arg(long)]
        role: Role,
        /// Calendar year
        #[arg(long)]
        year: i32,
        /// Calendar month, 1 to 12
        #[arg(long)]
        month: u32,
    },
    /// Statistics for one calendar year
    Yearly {
        /// Node role
        #[arg(long)]
        role: Role,
        /// Calendar year
        #[arg(long)]
        year: i32,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments and environment variables
    /// 2. Config file
    /// 3. Defaults
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = match &self.config {
            Some(path) => Some(path.clone()),
            None => dirs::config_dir()
                .map(|d| d.join("nodemeter").join("config.yaml"))
                .filter(|p| p.exists()),
        };

        if let Some(path) = config_path {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    builder = builder.from_yaml(&content)?;
                    tracing::info!("Loaded configuration from: {:?}", path);
                },
                Err(e) if self.config.is_some() => {
                    return Err(NodemeterError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
                Err(_) => {
                    tracing::debug!("No config file found at {:?}, using defaults", path);
                },
            }
        }

        if let Some(db_path) = &self.db_path {
            builder = builder.db_path(db_path.clone());
        }
        builder.debug(self.debug).build()
    }

    /// Initialize logging on stderr.
    ///
    /// `RUST_LOG` overrides everything; otherwise the level comes from
    /// [`effective_log_level`].
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level = std::env::var("NODEMETER_LOG_LEVEL").ok();
        let log_level = effective_log_level(self.debug, env_log_level.as_deref(), config);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| NodemeterError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Picks the log filter: `--debug`, then `NODEMETER_LOG_LEVEL`, then the
/// config file's `logging.level`.
pub fn effective_log_level<'a>(debug: bool, env_level: Option<&'a str>, config: &Config) -> &'a str {
    if debug {
        return "debug";
    }
    match env_level {
        Some(level) if !level.trim().is_empty() => level,
        _ => config.logging.level.as_str(),
    }
}

/// Execute a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;
    cli.init_logging(&config)?;
    tracing::debug!(backend = ?config.storage.backend, db_path = ?config.storage.db_path, "Configuration loaded");

    let result = run_command(cli.command, &config).await;
    if let Err(e) = &result {
        if e.is_recoverable() {
            tracing::warn!("Metric store is busy, try again later: {}", e);
        } else {
            tracing::error!(category = e.category(), "Command failed: {}", e);
        }
    }
    result
}

async fn run_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Ingest { role, ts, file } => {
            let raw = match file {
                Some(path) => tokio::fs::read_to_string(&path).await?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                },
            };
            let payload: serde_json::Value = serde_json::from_str(&raw)?;
            let ts = ts.unwrap_or_else(|| Utc::now().timestamp());

            let store = open_store(config)?;
            let inserted = ingest_payload(store.as_ref(), role, ts, &payload)?;
            tracing::info!(%role, ts, inserted, "Ingested payload");
            print_json(&serde_json::json!({ "role": role, "ts": ts, "inserted": inserted }))
        },
        Command::Latest { role } => {
            let store = open_store_readonly(config)?;
            print_json(&store.latest(role)?)
        },
        Command::Chart {
            role,
            metric,
            period,
            end,
            calendar_year,
        } => {
            let store = open_store_readonly(config)?;
            let end = end.unwrap_or_else(|| Utc::now().timestamp());
            let mut request = SeriesRequest::new(role, &metric, period, end);
            if let Some(year) = calendar_year {
                let (start, stop) = calendar_year_bounds(year)?;
                request = request.with_x_range(start, stop);
            }

            let builder = ChartSeriesBuilder::with_config(store.as_ref(), config);
            let series = builder.build_series(&request)?;
            if series.is_empty() {
                tracing::info!(%role, metric = %metric, %period, "No data in window");
            }
            print_json(&series)
        },
        Command::Charts { role, end } => {
            let store = open_store_readonly(config)?;
            let end = end.unwrap_or_else(|| Utc::now().timestamp());
            let builder = ChartSeriesBuilder::with_config(store.as_ref(), config);
            let charts = builder.build_role_charts(role, end)?;
            tracing::info!(%role, series = charts.series.len(), "Built charts");
            print_json(&ChartStatsDocument::from(&charts))
        },
        Command::Report { kind } => {
            let store = open_store_readonly(config)?;
            let aggregator = PeriodAggregator::new(store.as_ref());
            match kind {
                ReportKind::Monthly { role, year, month } => {
                    let summary = aggregator.aggregate_monthly(role, year, month)?;
                    let days = summary.days_with_data();
                    tracing::info!(%role, year, month, days, "Built monthly report");
                    print_json(&ReportDocument::monthly(&summary, config, Utc::now()))
                },
                ReportKind::Yearly { role, year } => {
                    let summary = aggregator.aggregate_yearly(role, year)?;
                    let days = summary.days_with_data();
                    tracing::info!(%role, year, days, "Built yearly report");
                    print_json(&ReportDocument::yearly(&summary, config, Utc::now()))
                },
            }
        },
        Command::Periods { role } => {
            let store = open_store_readonly(config)?;
            let periods = store.available_periods(role)?;
            let entries: Vec<PeriodEntry> = periods
                .into_iter()
                .map(|(year, month)| PeriodEntry { year, month })
                .collect();
            print_json(&entries)
        },
        Command::Compact => {
            let store = open_store(config)?;
            store.compact()?;
            print_json(&serde_json::json!({ "compacted": true }))
        },
        Command::CheckConfig => {
            config.validate()?;
            print_json(config)
        },
    }
}

#[derive(Serialize)]
struct PeriodEntry {
    year: i32,
    month: u32,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}
