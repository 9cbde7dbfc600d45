use super::output::{print_chart, print_ranking, spinner};
use crate::analytics::{aggregate, heatmap, rank, ranking_today, ChartRequest, RankRequest};
use crate::config::{now_in, Config};
use crate::db::{Database, MemoryStore, ReadingStore};
use crate::error::{AppError, Result};
use crate::models::Metric;
use crate::sample::SampleGenerator;
use chrono::{FixedOffset, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Largest ranking page the CLI will ask for.
pub const MAX_RANK_LIMIT: i64 = 100;

/// Province-aware air quality charts and daily rankings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read sensor readings from a JSON file instead of PostgreSQL
    #[arg(long, global = true, value_name = "FILE")]
    pub readings: Option<PathBuf>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Initialize the database schema
    InitDb,

    /// Generate sample readings into the store (or a JSON file)
    Seed {
        /// Number of trailing days to cover
        #[arg(short, long, default_value = "7")]
        days: u32,

        /// Readings per site per day
        #[arg(long, default_value = "24")]
        per_day: u32,

        /// Write the readings to this JSON file instead of the store
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Per-province chart over a time range
    Chart(ChartArgs),

    /// Rank addresses, places or provinces for one day
    Rank(RankArgs),

    /// One year of daily averages for a province
    Heatmap(HeatmapArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ChartArgs {
    /// Today, "24 Hour", "1 Week", "1 Month", "3 Month" or "1 Year"
    #[arg(short, long, default_value = "24 Hour")]
    pub range: String,

    /// Only chart this province (Thai or English name)
    #[arg(short, long)]
    pub province: Option<String>,

    #[arg(short, long, default_value = "pm25")]
    pub metric: String,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct RankArgs {
    /// Day to rank (YYYY-MM-DD, UTC+7); defaults to today
    #[arg(short, long)]
    pub date: Option<String>,

    #[arg(short, long, default_value = "pm25")]
    pub metric: String,

    /// address, place or province
    #[arg(short, long, default_value = "province")]
    pub group: String,

    /// Rows to return, clamped to 1..=100
    #[arg(short, long, default_value = "10", allow_negative_numbers = true)]
    pub limit: i64,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct HeatmapArgs {
    #[arg(short, long)]
    pub province: String,

    #[arg(short, long, default_value = "pm25")]
    pub metric: String,
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_RANK_LIMIT)
}

/// Where readings come from.
pub enum Backend {
    Postgres(Database),
    /// A JSON readings file, loaded once.
    File { path: PathBuf, store: MemoryStore },
}

/// CLI application
pub struct App {
    backend: Backend,
    chart_zone: FixedOffset,
    json: bool,
}

impl App {
    /// Connects to PostgreSQL, or loads `readings` when given.
    pub async fn new(config: &Config, readings: Option<&Path>, json: bool) -> Result<Self> {
        let backend = match readings {
            Some(path) => {
                let store = if path.exists() {
                    MemoryStore::from_json_file(path)?
                } else {
                    info!("{} does not exist yet, starting empty", path.display());
                    MemoryStore::default()
                };
                Backend::File {
                    path: path.to_path_buf(),
                    store,
                }
            },
            None => Backend::Postgres(Database::new(&config.database_url, config.max_connections).await?),
        };
        Ok(Self::with_backend(backend, config.chart_zone(), json))
    }

    pub fn with_backend(backend: Backend, chart_zone: FixedOffset, json: bool) -> Self {
        Self {
            backend,
            chart_zone,
            json,
        }
    }

    fn store(&self) -> &dyn ReadingStore {
        match &self.backend {
            Backend::Postgres(db) => db,
            Backend::File { store, .. } => store,
        }
    }

    /// Run one command
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::InitDb => self.init_db().await,
            Commands::Seed { days, per_day, out } => self.seed(days, per_day, out.as_deref()).await,
            Commands::Chart(args) => self.chart(args).await,
            Commands::Rank(args) => self.rank(args).await,
            Commands::Heatmap(args) => self.heatmap(args).await,
        }
    }

    async fn init_db(&self) -> Result<()> {
        match &self.backend {
            Backend::Postgres(db) => {
                db.init_schema().await?;
                info!("Database schema initialized successfully");
                Ok(())
            },
            Backend::File { .. } => Err(AppError::Cli(
                "init-db needs PostgreSQL; drop --readings".to_string(),
            )),
        }
    }

    async fn seed(&self, days: u32, per_day: u32, out: Option<&Path>) -> Result<()> {
        let readings = SampleGenerator::default()
            .with_density(per_day)
            .generate(Utc::now(), days);
        info!("Generated {} sample readings over {} days", readings.len(), days);

        if let Some(out) = out {
            return MemoryStore::new(readings).save_json(out);
        }
        match &self.backend {
            Backend::Postgres(db) => {
                db.init_schema().await?;
                db.insert_readings(&readings).await
            },
            Backend::File { path, store } => {
                let mut merged = store.clone();
                merged.extend(readings);
                info!("{} now holds {} readings", path.display(), merged.readings().len());
                merged.save_json(path)
            },
        }
    }

    /// Fails when PostgreSQL has no schema yet and warns when the store holds no readings.
    async fn ensure_queryable(&self) -> Result<()> {
        match &self.backend {
            Backend::Postgres(db) => {
                if !db.is_schema_initialized().await? {
                    return Err(AppError::Cli(
                        "the sensor_data table does not exist; run init-db or seed first".to_string(),
                    ));
                }
                if !db.has_data_imported().await? {
                    warn!("No readings stored yet; run seed to generate sample data");
                }
            },
            Backend::File { path, store } => {
                if store.readings().is_empty() {
                    warn!("{} holds no readings; run seed to generate sample data", path.display());
                }
            },
        }
        Ok(())
    }

    async fn chart(&self, args: ChartArgs) -> Result<()> {
        let request = ChartRequest::parse(&args.range, args.province.as_deref(), &args.metric)?;
        self.ensure_queryable().await?;
        let pb = spinner("Aggregating readings...", self.json)?;
        let chart = aggregate(self.store(), &request, now_in(self.chart_zone)).await;
        pb.finish_and_clear();
        let chart = chart?;

        let title = match &request.province {
            Some(p) => format!("{} {} for {}", request.range, request.metric, p),
            None => format!("{} {} by province", request.range, request.metric),
        };
        print_chart(&title, &chart, request.metric, self.json, false)
    }

    async fn rank(&self, args: RankArgs) -> Result<()> {
        let date = args
            .date
            .unwrap_or_else(|| ranking_today().format("%Y-%m-%d").to_string());
        let request = RankRequest::parse(&date, &args.metric, &args.group, clamp_limit(args.limit))?;
        self.ensure_queryable().await?;
        let pb = spinner("Ranking...", self.json)?;
        let rows = rank(self.store(), &request).await;
        pb.finish_and_clear();
        let rows = rows?;

        let title = format!(
            "Top {} {} by {} on {}",
            request.limit, request.group, request.metric, request.date
        );
        print_ranking(&title, &rows, request.metric, self.json)
    }

    async fn heatmap(&self, args: HeatmapArgs) -> Result<()> {
        let metric: Metric = args.metric.parse()?;
        self.ensure_queryable().await?;
        let pb = spinner("Building heatmap...", self.json)?;
        let chart = heatmap(self.store(), &args.province, metric, now_in(self.chart_zone)).await;
        pb.finish_and_clear();
        let chart = chart?;

        let title = format!("Daily {} for {} over the last year", metric, args.province);
        print_chart(&title, &chart, metric, self.json, true)
    }
}
