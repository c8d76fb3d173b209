//! Redis-backed analytics cache, shareable between processes.
//!
//! Keys are stored verbatim, so an instance populated by another service following the same `analytics:` prefix
//! conventions is interoperable.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::traits::AnalyticsCache;
use crate::types::Error;
use crate::types::Result;

/// Number of keys asked for per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

pub struct RedisCache {
    conn: ConnectionManager,
    url:  String,
}

impl RedisCache {
    /// Connect to Redis, e.g. `redis://127.0.0.1:6379`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| Error::cache("redis", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::cache("redis", format!("connection manager error: {e}")))?;

        Ok(Self {
            conn,
            url: redis_url.to_string(),
        })
    }
}

#[async_trait]
impl AnalyticsCache for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(|e| Error::cache(self.name(), e))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET EX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| Error::cache(self.name(), e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(|e| Error::cache(self.name(), e))
    }

    async fn scan_delete(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        let mut removed = 0u64;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::cache(self.name(), e))?;

            if !keys.is_empty() {
                let count: u64 = conn.del(&keys).await.map_err(|e| Error::cache(self.name(), e))?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(prefix, removed, "redis scan-delete");
        Ok(removed)
    }
}

impl Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;
    use std::time::UNIX_EPOCH;

    use super::*;

    /// Connects to `LIVEOPS_TEST_REDIS_URL`. Tests pass trivially when it isn't set.
    async fn cache() -> Option<RedisCache> {
        let url = std::env::var("LIVEOPS_TEST_REDIS_URL").ok()?;
        Some(RedisCache::connect(&url).await.unwrap())
    }

    /// A key namespace no other test run shares.
    fn namespace(test: &str) -> String {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("liveops-test:{}:{nanos}:{test}:", std::process::id())
    }

    #[tokio::test]
    async fn set_then_get() {
        let Some(cache) = cache().await else { return };
        let ns = namespace("set-get");
        let key = format!("{ns}analytics:killer_winrate");

        assert_eq!(cache.get(&key).await.unwrap(), None);
        cache.set(&key, "{\"rate\":0.5}".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("{\"rate\":0.5}"));

        cache.scan_delete(&ns).await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let Some(cache) = cache().await else { return };
        let key = format!("{}k", namespace("expire"));

        cache.set(&key, "v".into(), Duration::from_secs(1)).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn subsecond_ttl_is_rounded_up() {
        let Some(cache) = cache().await else { return };
        let key = format!("{}k", namespace("subsecond"));

        cache.set(&key, "v".into(), Duration::from_millis(50)).await.unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_expiry() {
        let Some(cache) = cache().await else { return };
        let ns = namespace("overwrite");
        let key = format!("{ns}k");

        cache.set(&key, "old".into(), Duration::from_secs(1)).await.unwrap();
        cache.set(&key, "new".into(), Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("new"));

        cache.scan_delete(&ns).await.unwrap();
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let Some(cache) = cache().await else { return };
        let key = format!("{}k", namespace("delete"));

        cache.delete(&key).await.unwrap();
        cache.set(&key, "v".into(), Duration::from_secs(60)).await.unwrap();
        cache.delete(&key).await.unwrap();
        cache.delete(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn scan_delete_removes_only_prefixed_keys() {
        let Some(cache) = cache().await else { return };
        let ns = namespace("scan");
        let ttl = Duration::from_secs(60);

        for key in ["series:day:7d", "series:hour:30d", "other"] {
            cache.set(&format!("{ns}{key}"), "v".into(), ttl).await.unwrap();
        }

        assert_eq!(cache.scan_delete(&format!("{ns}series:")).await.unwrap(), 2);
        assert_eq!(cache.get(&format!("{ns}series:day:7d")).await.unwrap(), None);
        assert!(cache.get(&format!("{ns}other")).await.unwrap().is_some());
        assert_eq!(cache.scan_delete(&format!("{ns}series:")).await.unwrap(), 0);

        cache.scan_delete(&ns).await.unwrap();
    }

    #[tokio::test]
    async fn scan_delete_spans_several_pages() {
        let Some(cache) = cache().await else { return };
        let ns = namespace("pages");
        let total = SCAN_BATCH * 2 + 200;

        for idx in 0..total {
            cache
                .set(&format!("{ns}series:{idx}"), "v".into(), Duration::from_secs(60))
                .await
                .unwrap();
        }

        assert_eq!(cache.scan_delete(&format!("{ns}series:")).await.unwrap(), total as u64);
        assert_eq!(cache.get(&format!("{ns}series:0")).await.unwrap(), None);
        assert_eq!(cache.get(&format!("{ns}series:{}", total - 1)).await.unwrap(), None);
    }
}
