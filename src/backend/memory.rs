use async_trait::async_trait;
use fieldx::fxstruct;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use moka::Expiry;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;

use crate::traits::AnalyticsCache;
use crate::types::Result;

#[derive(Clone, Debug)]
pub(crate) struct CachedValue {
    payload: String,
    ttl:     Duration,
}

// Each entry carries its own TTL; an overwrite restarts the clock with the new entry's TTL.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process analytics cache over [moka](https://crates.io/crates/moka).
///
/// ```ignore
/// let cache = MemoryCache::builder().name("analytics").max_capacity(50_000).build()?;
/// cache.set("analytics:killer_winrate", payload, Duration::from_secs(60)).await?;
/// ```
#[fxstruct(sync, no_new, builder, get(copy))]
pub struct MemoryCache {
    /// Cache name. Most useful for debugging and logging.
    #[fieldx(get(off), builder(into), default("memory".to_string()))]
    name: String,

    #[fieldx(default(10_000))]
    max_capacity: u64,

    #[fieldx(lazy, private, get(clone), builder(off))]
    cache: Arc<Cache<String, CachedValue>>,
}

impl MemoryCache {
    fn build_cache(&self) -> Arc<Cache<String, CachedValue>> {
        Arc::new(
            Cache::builder()
                .max_capacity(self.max_capacity())
                .name(&self.name)
                .eviction_policy(EvictionPolicy::tiny_lfu())
                .expire_after(PerEntryTtl)
                .build(),
        )
    }

    /// Number of live entries, after applying the writes and removals moka still holds pending.
    pub async fn entry_count(&self) -> u64 {
        let cache = self.cache();
        cache.run_pending_tasks().await;
        cache.entry_count()
    }
}

#[async_trait]
impl AnalyticsCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache().get(key).await.map(|v| v.payload))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.cache()
            .insert(key.to_string(), CachedValue { payload: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache().invalidate(key).await;
        Ok(())
    }

    async fn scan_delete(&self, prefix: &str) -> Result<u64> {
        let cache = self.cache();
        // Collect before removing; the iterator must not observe its own removals.
        let matching = cache
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect::<Vec<_>>();

        let mut removed = 0;
        for key in matching {
            if cache.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        debug!(cache = %self.name, prefix, removed, "prefix scan-delete");
        Ok(removed)
    }
}

impl Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("name", &self.name)
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}
