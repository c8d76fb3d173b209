//! Write-invalidation path.
//!
//! After a match write is committed, every cache entry whose value may depend on it is removed: the fixed aggregates,
//! the well-known recency windows, and everything under the time-series prefixes. Recency windows for arbitrary `days`
//! values are not enumerable and are left to their TTL.
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;
use tracing::instrument;

use crate::backend::bounded;
use crate::key::CacheKey;
use crate::traits::AnalyticsCache;
use crate::traits::Observer;
use crate::types::SharedError;

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct InvalidationFailure {
    /// The key or prefix that could not be cleared.
    pub target: String,
    pub error:  SharedError,
}

#[derive(Debug, Clone, Default)]
pub struct InvalidationReport {
    pub deleted_keys: Vec<String>,
    /// Number of entries removed by prefix scans.
    pub scan_deleted: u64,
    pub failures:     Vec<InvalidationFailure>,
}

impl InvalidationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Invalidator<C>
where
    C: AnalyticsCache,
{
    cache:      Arc<C>,
    observer:   Option<Arc<dyn Observer>>,
    op_timeout: Duration,
}

impl<C> Invalidator<C>
where
    C: AnalyticsCache,
{
    pub fn new(cache: Arc<C>) -> Self {
        Self {
            cache,
            observer: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_observer(mut self, observer: Option<Arc<dyn Observer>>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Run the invalidation to completion. A failing step does not stop the following ones; failures are collected
    /// into the report instead of being returned.
    #[instrument(level = "debug", skip(self), fields(cache = %self.cache.name()))]
    pub async fn invalidate(&self) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        for key in CacheKey::enumerable() {
            let key = key.to_string();
            match bounded(self.op_timeout, &key, self.cache.delete(&key)).await {
                Ok(()) => report.deleted_keys.push(key),
                Err(err) => report.failures.push(InvalidationFailure {
                    target: key,
                    error:  Arc::new(err),
                }),
            }
        }

        for prefix in CacheKey::series_prefixes() {
            match bounded(self.op_timeout, &prefix, self.cache.scan_delete(&prefix)).await {
                Ok(count) => report.scan_deleted += count,
                Err(err) => report.failures.push(InvalidationFailure {
                    target: prefix,
                    error:  Arc::new(err),
                }),
            }
        }

        report
    }

    /// Submit the invalidation as a detached task. The caller is not expected to await the handle; failures are
    /// logged and passed to the observer, never propagated.
    pub fn spawn(&self) -> JoinHandle<()> {
        let invalidator = self.clone();
        tokio::spawn(async move {
            let report = invalidator.invalidate().await;
            invalidator.publish(&report).await;
        })
    }

    async fn publish(&self, report: &InvalidationReport) {
        if report.is_complete() {
            info!(
                keys = report.deleted_keys.len(),
                scanned = report.scan_deleted,
                "analytics cache invalidated"
            );
        }
        else {
            for failure in &report.failures {
                error!(
                    entry = %failure.target,
                    error = %failure.error,
                    "cache invalidation failed; entry stays until its TTL expires"
                );
            }
        }

        if let Some(observer) = &self.observer {
            for failure in &report.failures {
                observer.on_error(Arc::clone(&failure.error)).await;
            }
            observer.on_invalidated(report).await;
        }
    }
}

impl<C> Clone for Invalidator<C>
where
    C: AnalyticsCache,
{
    fn clone(&self) -> Self {
        Self {
            cache:      Arc::clone(&self.cache),
            observer:   self.observer.clone(),
            op_timeout: self.op_timeout,
        }
    }
}

impl<C> Debug for Invalidator<C>
where
    C: AnalyticsCache,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invalidator")
            .field("cache", &self.cache)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}
