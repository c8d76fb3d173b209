//! Runtime configuration, read from the command line or `LIVEOPS_*` environment variables.
use std::time::Duration;

use fieldx::fxstruct;
use garde::Validate;

use crate::analytics::TtlPolicy;
use crate::types::Error;
use crate::types::Result;

#[derive(Debug, Clone, clap::Args, Validate)]
#[fxstruct(no_new, get(copy))]
pub struct Config {
    /// Record store connection URL.
    #[clap(long, env = "LIVEOPS_DATABASE_URL", default_value = "sqlite://liveops.db?mode=rwc")]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    database_url: String,

    /// Redis URL for the analytics cache. The in-process cache is used when omitted.
    #[clap(long, env = "LIVEOPS_REDIS_URL")]
    #[fieldx(get(clone))]
    #[garde(custom(Self::redis_scheme))]
    redis_url: Option<String>,

    /// Maximum number of entries of the in-process cache.
    #[clap(long, env = "LIVEOPS_CACHE_CAPACITY", default_value_t = 10_000)]
    #[garde(range(min = 1))]
    cache_capacity: u64,

    /// TTL of the parameterless aggregates, in seconds.
    #[clap(long, env = "LIVEOPS_AGGREGATE_TTL", default_value_t = 60)]
    #[garde(range(min = 1))]
    aggregate_ttl: u64,

    /// TTL of the recency-window win rates, in seconds.
    #[clap(long, env = "LIVEOPS_WINDOW_TTL", default_value_t = 300)]
    #[garde(range(min = 1))]
    window_ttl: u64,

    /// TTL of the time series, in seconds.
    #[clap(long, env = "LIVEOPS_SERIES_TTL", default_value_t = 600)]
    #[garde(range(min = 1))]
    series_ttl: u64,

    /// Give up on a cache operation after this many milliseconds and serve from the record store.
    #[clap(long, env = "LIVEOPS_CACHE_TIMEOUT_MS", default_value_t = 250)]
    #[garde(range(min = 1, max = 60_000))]
    cache_timeout_ms: u64,

    /// Tracing filter directives, e.g. `liveops_analytics=debug`. Falls back to `RUST_LOG`, then to `info`.
    #[clap(long, env = "LIVEOPS_LOG")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_filter: Option<String>,
}

impl Config {
    #[allow(clippy::ref_option)]
    fn redis_scheme(value: &Option<String>, _ctx: &()) -> garde::Result {
        match value {
            Some(url) if !(url.starts_with("redis://") || url.starts_with("rediss://")) => {
                Err(garde::Error::new(format!("'{url}' is not a redis:// URL")))
            }
            _ => Ok(()),
        }
    }

    /// Validate the values clap can't check by itself.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|report| Error::Config(report.to_string()))
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::new(
            Duration::from_secs(self.aggregate_ttl),
            Duration::from_secs(self.window_ttl),
            Duration::from_secs(self.series_ttl),
        )
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}
