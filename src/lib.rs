//! # liveops-analytics
//!
//! Read-optimized analytics over match results of an asymmetric multiplayer game: one killer against four survivors.
//!
//! Think of it as a cache-aside layer in front of a relational record store.
//!
//! # The Basics
//!
//! Three paths make up the crate:
//!
//! - **Ingestion.** [`MatchIngest`] validates a submitted match, commits it together with its participation records in
//!   a single transaction and only then signals the write-invalidation path.
//! - **Invalidation.** [`Invalidator`] removes every cache entry whose value depends on the full match set. It runs as
//!   a detached task; its failures are logged and reported to an [`Observer`], never to the writer.
//! - **Reads.** [`Analytics`] serves each metric from the cache when it can and falls back to the
//!   [`QueryEngine`](engine::QueryEngine) when it can't. A cache that errors or stalls is a cache miss, not an error.
//!
//! Entries carry a TTL chosen by their metric class: parameterless aggregates change with every match and live for a
//! minute, recency windows for five, time series for ten. Eager invalidation is what keeps them fresh; TTLs are the
//! safety net, and the only freshness mechanism for recency windows other than 7 and 30 days.
//!
//! # Metrics
//!
//! | Operation | Cache key |
//! | --------- | --------- |
//! | [`Analytics::killer_win_rate`] | `analytics:killer_winrate` |
//! | [`Analytics::average_duration`] | `analytics:avg_duration` |
//! | [`Analytics::perk_pick_rates`] | `analytics:perk_pickrate` |
//! | [`Analytics::recent_win_rate`] | `analytics:killer_winrate:<days>d` |
//! | [`Analytics::win_rate_timeseries`] | `analytics:killer_winrate:timeseries:<interval>:<days>d` |
//! | [`Analytics::perk_usage_timeseries`] | `analytics:perk_usage:timeseries:<interval>:<days>d` |
//!
//! Values are computed and cached at full precision; call `rounded()` on a result before presenting it.
//!
//! # Backends
//!
//! - Cache: [`MemoryCache`](backend::MemoryCache) over [moka](https://crates.io/crates/moka), or
//!   `RedisCache` with the `redis` feature.
//! - Record store: [`SeaOrmStore`](store::SeaOrmStore) over SQLite (`sqlite` feature) or PostgreSQL (`pg` feature).

pub mod analytics;
pub mod backend;
#[cfg(feature = "cli")]
pub mod config;
pub mod driver;
pub mod engine;
pub mod entity;
pub mod ingest;
pub mod invalidation;
pub mod key;
pub mod migrations;
pub mod store;
pub mod traits;
pub mod types;

#[doc(inline)]
pub use analytics::Analytics;
#[doc(inline)]
pub use ingest::MatchIngest;
#[doc(inline)]
pub use invalidation::Invalidator;
#[doc(inline)]
pub use traits::Observer;

pub mod prelude {
    pub use crate::analytics::Analytics;
    pub use crate::analytics::TtlPolicy;
    pub use crate::backend::MemoryCache;
    pub use crate::ingest::MatchIngest;
    pub use crate::ingest::NewMatch;
    pub use crate::ingest::NewPlayer;
    pub use crate::invalidation::Invalidator;
    pub use crate::key::CacheKey;
    pub use crate::store::SeaOrmStore;
    pub use crate::traits::AnalyticsCache;
    pub use crate::traits::Observer;
    pub use crate::traits::RecordStore;
    pub use crate::types::*;
}
