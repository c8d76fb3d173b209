//! Cache-aside read path.
//!
//! Each analytics operation names its artifact with a [`CacheKey`], looks it up in the cache and, on a miss, computes
//! it with the [`QueryEngine`] and stores the serialized result with a TTL chosen by the key's [`MetricClass`].
//!
//! The cache is only a fast path: a cache that errors or stalls beyond `cache_timeout` is treated as a miss, and a
//! failed population is logged and ignored. Only a failing record store fails a request. Concurrent misses for the
//! same key may compute the value more than once; each writes an equivalent result.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldx::fxstruct;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use crate::backend::bounded;
use crate::engine::QueryEngine;
use crate::invalidation::Invalidator;
use crate::key::CacheKey;
use crate::key::MetricClass;
use crate::traits::AnalyticsCache;
use crate::traits::Observer;
use crate::traits::RecordStore;
use crate::types::validate_days;
use crate::types::AverageDuration;
use crate::types::BucketInterval;
use crate::types::Error;
use crate::types::PerkPickRates;
use crate::types::PerkUsagePoint;
use crate::types::Result;
use crate::types::WinRate;
use crate::types::WinRatePoint;

pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

/// Time-to-live per metric class. Eager invalidation is the primary staleness control; TTLs cover missed
/// invalidations and the keys invalidation cannot enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub aggregate: Duration,
    pub window:    Duration,
    pub series:    Duration,
}

impl TtlPolicy {
    pub const fn new(aggregate: Duration, window: Duration, series: Duration) -> Self {
        Self {
            aggregate,
            window,
            series,
        }
    }

    pub fn ttl_for(&self, class: MetricClass) -> Duration {
        match class {
            MetricClass::Aggregate => self.aggregate,
            MetricClass::Window => self.window,
            MetricClass::Series => self.series,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(60),
            Duration::from_secs(300),
            Duration::from_secs(600),
        )
    }
}

/// Analytics operations exposed to the transport layer.
///
/// ```ignore
/// let analytics = Analytics::builder()
///     .store(store)
///     .cache(cache)
///     .ttl_policy(config.ttl_policy())
///     .build()?;
///
/// let rate = analytics.recent_win_rate(7).await?.rounded();
/// ```
#[fxstruct(sync, no_new, default(off), builder)]
pub struct Analytics<S, C>
where
    S: RecordStore,
    C: AnalyticsCache,
{
    #[fieldx(get(clone))]
    store: Arc<S>,

    #[fieldx(get(clone))]
    cache: Arc<C>,

    #[fieldx(get(copy), default(TtlPolicy::default()))]
    ttl_policy: TtlPolicy,

    /// Upper bound for any single cache operation on the read path.
    #[fieldx(get(copy), default(DEFAULT_CACHE_TIMEOUT))]
    cache_timeout: Duration,

    #[fieldx(get(clone), default(None))]
    observer: Option<Arc<dyn Observer>>,

    #[fieldx(lazy, private, get(clone), builder(off))]
    engine: Arc<QueryEngine<S>>,
}

impl<S, C> Analytics<S, C>
where
    S: RecordStore,
    C: AnalyticsCache,
{
    fn build_engine(&self) -> Arc<QueryEngine<S>> {
        Arc::new(QueryEngine::new(self.store()))
    }

    /// The write-invalidation path over the same cache.
    pub fn invalidator(&self) -> Invalidator<C> {
        Invalidator::new(self.cache())
            .with_observer(self.observer())
            .with_op_timeout(self.cache_timeout().max(crate::invalidation::DEFAULT_OP_TIMEOUT))
    }

    pub async fn killer_win_rate(&self) -> Result<WinRate> {
        let engine = self.engine();
        self.cached(CacheKey::KillerWinRate, || async move { engine.killer_win_rate().await })
            .await
    }

    pub async fn average_duration(&self) -> Result<AverageDuration> {
        let engine = self.engine();
        self.cached(CacheKey::AverageDuration, || async move { engine.average_duration().await })
            .await
    }

    pub async fn perk_pick_rates(&self) -> Result<PerkPickRates> {
        let engine = self.engine();
        self.cached(CacheKey::PerkPickRates, || async move { engine.perk_pick_rates().await })
            .await
    }

    pub async fn recent_win_rate(&self, days: u32) -> Result<WinRate> {
        let days = validate_days(days)?;
        let engine = self.engine();
        self.cached(CacheKey::RecentWinRate { days }, || async move {
            engine.recent_win_rate(days).await
        })
        .await
    }

    pub async fn win_rate_timeseries(&self, interval: BucketInterval, days: u32) -> Result<Vec<WinRatePoint>> {
        let days = validate_days(days)?;
        let engine = self.engine();
        self.cached(CacheKey::WinRateSeries { interval, days }, || async move {
            engine.win_rate_timeseries(interval, days).await
        })
        .await
    }

    pub async fn perk_usage_timeseries(&self, interval: BucketInterval, days: u32) -> Result<Vec<PerkUsagePoint>> {
        let days = validate_days(days)?;
        let engine = self.engine();
        self.cached(CacheKey::PerkUsageSeries { interval, days }, || async move {
            engine.perk_usage_timeseries(interval, days).await
        })
        .await
    }

    async fn cached<T, F, Fut>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key_str = key.to_string();

        if let Some(value) = self.lookup(&key_str).await {
            debug!(key = %key_str, "cache hit");
            return Ok(value);
        }

        debug!(key = %key_str, "cache miss, computing");
        let value = compute().await?;
        self.populate(&key_str, &value, self.ttl_policy().ttl_for(key.class()))
            .await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache();
        match bounded(self.cache_timeout(), key, cache.get(key)).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => Some(value),
                Err(err) => {
                    self.degraded(key, err.into()).await;
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                self.degraded(key, err).await;
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                self.degraded(key, err.into()).await;
                return;
            }
        };

        let cache = self.cache();
        if let Err(err) = bounded(self.cache_timeout(), key, cache.set(key, payload, ttl)).await {
            self.degraded(key, err).await;
        }
    }

    async fn degraded(&self, key: &str, err: Error) {
        warn!(key, error = %err, "analytics cache unavailable, serving from the record store");
        if let Some(observer) = self.observer() {
            observer
                .on_warning(&format!("cache fallback for '{key}': {err}"))
                .await;
        }
    }
}
