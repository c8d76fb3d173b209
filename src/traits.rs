use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;

use crate::ingest::NewMatch;
use crate::invalidation::InvalidationReport;
use crate::types::DurationTally;
use crate::types::MatchOutcome;
use crate::types::MatchTally;
use crate::types::PerkUse;
use crate::types::Result;
use crate::types::SharedError;

/// Key/value storage with expiring entries holding serialized metric results.
///
/// Implementations must never block indefinitely; the read path wraps every call in a timeout anyway.
#[async_trait]
pub trait AnalyticsCache: Debug + Send + Sync + 'static {
    /// Backend name for logs and error messages.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Unconditional overwrite; replaces any existing entry together with its expiry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key starting with `prefix`, returning how many were removed. Keys written concurrently with the
    /// scan may survive.
    async fn scan_delete(&self, prefix: &str) -> Result<u64>;
}

/// The source of truth the aggregate query engine reads from.
#[async_trait]
pub trait RecordStore: Debug + Send + Sync + 'static {
    /// Persist a validated match with its participation records as a single atomic write.
    async fn insert_match(&self, new_match: &NewMatch, created_at: DateTime<Utc>) -> Result<()>;

    /// Total and killer-won match counts, optionally limited to matches created at or after `since`.
    async fn match_tally(&self, since: Option<DateTime<Utc>>) -> Result<MatchTally>;

    async fn duration_tally(&self) -> Result<DurationTally>;

    /// Occurrences of every perk string over all participation records.
    async fn perk_counts(&self) -> Result<BTreeMap<String, u64>>;

    async fn outcomes_since(&self, since: DateTime<Utc>) -> Result<Vec<MatchOutcome>>;

    async fn perk_uses_since(&self, since: DateTime<Utc>) -> Result<Vec<PerkUse>>;
}

/// Receives notifications about background activity nobody awaits: failed invalidations, cache fallbacks.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    async fn on_invalidated(&self, _report: &InvalidationReport) {}
    async fn on_error(&self, _error: SharedError) {}
    async fn on_warning(&self, _message: &str) {}
}
