//! Analytics cache backends.
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

use std::future::Future;
use std::time::Duration;

use crate::types::Error;
use crate::types::Result;

/// Bound a cache operation so a degraded backend cannot stall the caller.
pub(crate) async fn bounded<T, F>(limit: Duration, key: &str, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| Error::CacheTimeout { key: key.to_string() })?
}
