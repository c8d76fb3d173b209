//! Cache key space.
//!
//! Every cacheable analytics artifact is named by exactly one [`CacheKey`] variant and every key string is produced by
//! its [`Display`] implementation. Nothing else in the crate builds key strings, which is what lets the invalidation
//! path enumerate the affected keys.
//!
//! | Variant | Key |
//! | ------- | --- |
//! | `KillerWinRate` | `analytics:killer_winrate` |
//! | `AverageDuration` | `analytics:avg_duration` |
//! | `PerkPickRates` | `analytics:perk_pickrate` |
//! | `RecentWinRate { days }` | `analytics:killer_winrate:<days>d` |
//! | `WinRateSeries { interval, days }` | `analytics:killer_winrate:timeseries:<interval>:<days>d` |
//! | `PerkUsageSeries { interval, days }` | `analytics:perk_usage:timeseries:<interval>:<days>d` |
use std::fmt::Display;

use crate::types::BucketInterval;

pub const NAMESPACE: &str = "analytics";

const KILLER_WIN_RATE: &str = "killer_winrate";
const AVERAGE_DURATION: &str = "avg_duration";
const PERK_PICK_RATE: &str = "perk_pickrate";
const PERK_USAGE: &str = "perk_usage";
const TIMESERIES: &str = "timeseries";

/// Recency windows that are invalidated eagerly on every match write. Other `days` values expire by TTL only.
pub const WELL_KNOWN_WINDOWS: [u32; 2] = [7, 30];

/// How volatile and how expensive an artifact is; selects its TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricClass {
    /// Parameterless aggregates over the full match set.
    Aggregate,
    /// Recency-windowed aggregates.
    Window,
    /// Time-bucketed series.
    Series,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    KillerWinRate,
    AverageDuration,
    PerkPickRates,
    RecentWinRate { days: u32 },
    WinRateSeries { interval: BucketInterval, days: u32 },
    PerkUsageSeries { interval: BucketInterval, days: u32 },
}

impl CacheKey {
    pub fn class(&self) -> MetricClass {
        match self {
            Self::KillerWinRate | Self::AverageDuration | Self::PerkPickRates => MetricClass::Aggregate,
            Self::RecentWinRate { .. } => MetricClass::Window,
            Self::WinRateSeries { .. } | Self::PerkUsageSeries { .. } => MetricClass::Series,
        }
    }

    /// Keys whose values depend on the full match set.
    pub fn fixed() -> [CacheKey; 3] {
        [Self::KillerWinRate, Self::AverageDuration, Self::PerkPickRates]
    }

    pub fn well_known_windows() -> impl Iterator<Item = CacheKey> {
        WELL_KNOWN_WINDOWS.into_iter().map(|days| Self::RecentWinRate { days })
    }

    /// Every key the invalidation path can name individually.
    pub fn enumerable() -> impl Iterator<Item = CacheKey> {
        Self::fixed().into_iter().chain(Self::well_known_windows())
    }

    /// Prefixes covering every series key regardless of interval and day count.
    pub fn series_prefixes() -> [String; 2] {
        [
            format!("{NAMESPACE}:{KILLER_WIN_RATE}:{TIMESERIES}:"),
            format!("{NAMESPACE}:{PERK_USAGE}:{TIMESERIES}:"),
        ]
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KillerWinRate => write!(f, "{NAMESPACE}:{KILLER_WIN_RATE}"),
            Self::AverageDuration => write!(f, "{NAMESPACE}:{AVERAGE_DURATION}"),
            Self::PerkPickRates => write!(f, "{NAMESPACE}:{PERK_PICK_RATE}"),
            Self::RecentWinRate { days } => write!(f, "{NAMESPACE}:{KILLER_WIN_RATE}:{days}d"),
            Self::WinRateSeries { interval, days } => {
                write!(f, "{NAMESPACE}:{KILLER_WIN_RATE}:{TIMESERIES}:{interval}:{days}d")
            }
            Self::PerkUsageSeries { interval, days } => {
                write!(f, "{NAMESPACE}:{PERK_USAGE}:{TIMESERIES}:{interval}:{days}d")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn sample_keys() -> Vec<CacheKey> {
        let mut keys = CacheKey::fixed().to_vec();
        for days in [1, 7, 30, 90, 365] {
            keys.push(CacheKey::RecentWinRate { days });
            for interval in [BucketInterval::Hour, BucketInterval::Day] {
                keys.push(CacheKey::WinRateSeries { interval, days });
                keys.push(CacheKey::PerkUsageSeries { interval, days });
            }
        }
        keys
    }

    #[test]
    fn keys_follow_the_shared_prefix_convention() {
        assert_eq!(CacheKey::KillerWinRate.to_string(), "analytics:killer_winrate");
        assert_eq!(CacheKey::RecentWinRate { days: 7 }.to_string(), "analytics:killer_winrate:7d");
        assert_eq!(
            CacheKey::WinRateSeries {
                interval: BucketInterval::Hour,
                days:     3,
            }
            .to_string(),
            "analytics:killer_winrate:timeseries:hour:3d"
        );
        assert_eq!(
            CacheKey::PerkUsageSeries {
                interval: BucketInterval::Day,
                days:     30,
            }
            .to_string(),
            "analytics:perk_usage:timeseries:day:30d"
        );
    }

    #[test]
    fn distinct_parameters_never_collide() {
        let keys = sample_keys();
        let strings: HashSet<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(strings.len(), keys.len());
    }

    #[test]
    fn series_prefixes_cover_series_keys_only() {
        let prefixes = CacheKey::series_prefixes();
        for key in sample_keys() {
            let covered = prefixes.iter().any(|p| key.to_string().starts_with(p.as_str()));
            assert_eq!(covered, key.class() == MetricClass::Series, "{key}");
        }
    }

    #[test]
    fn enumerable_keys_include_well_known_windows() {
        let keys: Vec<String> = CacheKey::enumerable().map(|k| k.to_string()).collect();
        assert!(keys.contains(&"analytics:killer_winrate:7d".to_string()));
        assert!(keys.contains(&"analytics:killer_winrate:30d".to_string()));
        assert_eq!(keys.len(), 5);
    }
}
