use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use liveops_analytics::config::Config;
use liveops_analytics::driver::DatabaseDriver;
use liveops_analytics::prelude::*;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[clap(about, version, author, name = "liveops")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the record store schema.
    Migrate,
    /// Submit matches from a JSON file holding one match or an array of them.
    Ingest {
        #[clap(long, short)]
        file: PathBuf,
    },
    /// Killer win rate, over all matches or over the last `--days`.
    Winrate {
        #[clap(long)]
        days: Option<u32>,
    },
    /// Average match duration.
    Duration,
    /// Perk pick counts.
    Perks,
    /// Time-bucketed win rate or perk usage.
    Series {
        /// Either `winrate` or `perks`.
        #[clap(long, default_value = "winrate")]
        metric: String,
        /// Either `hour` or `day`.
        #[clap(long, default_value = "day")]
        interval: String,
        #[clap(long, default_value_t = 7)]
        days: u32,
    },
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Submission {
    One(NewMatch),
    Many(Vec<NewMatch>),
}

fn setup_tracing(config: &Config) -> anyhow::Result<()> {
    let filter = match config.log_filter() {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(url: &str) -> anyhow::Result<Box<dyn DatabaseDriver>> {
    Ok(Box::new(liveops_analytics::driver::sqlite::Sqlite::open(url).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_url: &str) -> anyhow::Result<Box<dyn DatabaseDriver>> {
    bail!("SQLite support is not compiled in; rebuild with the 'sqlite' feature")
}

#[cfg(feature = "pg")]
async fn open_pg(url: &str) -> anyhow::Result<Box<dyn DatabaseDriver>> {
    Ok(Box::new(liveops_analytics::driver::pg::Pg::connect(url).await?))
}

#[cfg(not(feature = "pg"))]
async fn open_pg(_url: &str) -> anyhow::Result<Box<dyn DatabaseDriver>> {
    bail!("PostgreSQL support is not compiled in; rebuild with the 'pg' feature")
}

async fn connect(url: &str) -> anyhow::Result<Box<dyn DatabaseDriver>> {
    let driver = if url.starts_with("sqlite:") {
        open_sqlite(url).await?
    }
    else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
        open_pg(url).await?
    }
    else {
        bail!("unsupported database URL '{url}'")
    };

    driver.configure().await?;
    info!(driver = driver.name(), "record store connected");
    Ok(driver)
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run<C: AnalyticsCache>(cli: &Cli, store: Arc<SeaOrmStore>, cache: Arc<C>) -> anyhow::Result<()> {
    let config = &cli.config;
    let analytics = Analytics::builder()
        .store(Arc::clone(&store))
        .cache(cache)
        .ttl_policy(config.ttl_policy())
        .cache_timeout(config.cache_timeout())
        .build()?;

    match &cli.command {
        Command::Migrate => {
            store.migrate().await?;
            info!("schema is up to date");
        }
        Command::Ingest { file } => {
            let raw = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let matches = match serde_json::from_str(&raw)? {
                Submission::One(m) => vec![m],
                Submission::Many(many) => many,
            };

            let ingest = MatchIngest::new(store, analytics.invalidator());
            for new_match in matches {
                let ingested = ingest.ingest(new_match).await?;
                // A one-shot process must not exit before its invalidation task finishes.
                ingested.invalidation.await?;
                println!("{} {}", ingested.match_id, ingested.created_at.to_rfc3339());
            }
        }
        Command::Winrate { days } => match days {
            Some(days) => print(&analytics.recent_win_rate(*days).await?.rounded())?,
            None => print(&analytics.killer_win_rate().await?.rounded())?,
        },
        Command::Duration => print(&analytics.average_duration().await?.rounded())?,
        Command::Perks => print(&analytics.perk_pick_rates().await?)?,
        Command::Series { metric, interval, days } => {
            let interval = BucketInterval::parse(interval)?;
            match metric.as_str() {
                "winrate" => {
                    let series = analytics.win_rate_timeseries(interval, *days).await?;
                    print(&series.iter().map(WinRatePoint::rounded).collect::<Vec<_>>())?
                }
                "perks" => print(&analytics.perk_usage_timeseries(interval, *days).await?)?,
                other => bail!("unknown series metric '{other}'"),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(&cli.config)?;
    cli.config.check()?;

    let driver = connect(&cli.config.database_url()).await?;
    let store = Arc::new(SeaOrmStore::from_driver(driver.as_ref()));

    match cli.config.redis_url() {
        #[cfg(feature = "redis")]
        Some(url) => {
            let cache = Arc::new(liveops_analytics::backend::RedisCache::connect(&url).await?);
            run(&cli, store, cache).await
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => bail!("Redis support is not compiled in; rebuild with the 'redis' feature"),
        None => {
            let cache = Arc::new(
                MemoryCache::builder()
                    .name("liveops")
                    .max_capacity(cli.config.cache_capacity())
                    .build()?,
            );
            run(&cli, store, cache).await
        }
    }
}
