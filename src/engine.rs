//! Aggregate query engine.
//!
//! Every method is a pure function of the record store contents and its parameters; nothing is cached here. Values
//! keep full precision, rounding is left to the presentation layer.
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::DurationRound;
use chrono::TimeDelta;
use chrono::Utc;

use crate::traits::RecordStore;
use crate::types::ratio;
use crate::types::AverageDuration;
use crate::types::BucketInterval;
use crate::types::Error;
use crate::types::PerkPickRates;
use crate::types::PerkUsagePoint;
use crate::types::Result;
use crate::types::WinRate;
use crate::types::WinRatePoint;

/// Start of the bucket `ts` falls into. Buckets are aligned to the Unix epoch, i.e. to UTC hours and midnights.
pub fn bucket_start(ts: DateTime<Utc>, interval: BucketInterval) -> Result<DateTime<Utc>> {
    Ok(ts.duration_trunc(interval.width())?)
}

/// Inclusive lower bound of a `days`-long window ending at `now`.
pub fn window_start(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(days as i64)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| Error::invalid("days", format!("a {days}-day window is out of the timestamp range")))
}

#[derive(Debug, Default)]
struct BucketTally {
    matches:     u64,
    killer_wins: u64,
}

#[derive(Debug)]
pub struct QueryEngine<S>
where
    S: RecordStore,
{
    store: Arc<S>,
}

impl<S> QueryEngine<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn killer_win_rate(&self) -> Result<WinRate> {
        Ok(WinRate::from_tally(self.store.match_tally(None).await?))
    }

    pub async fn win_rate_since(&self, cutoff: DateTime<Utc>) -> Result<WinRate> {
        Ok(WinRate::from_tally(self.store.match_tally(Some(cutoff)).await?))
    }

    pub async fn recent_win_rate(&self, days: u32) -> Result<WinRate> {
        self.recent_win_rate_at(days, Utc::now()).await
    }

    pub async fn recent_win_rate_at(&self, days: u32, now: DateTime<Utc>) -> Result<WinRate> {
        self.win_rate_since(window_start(now, days)?).await
    }

    pub async fn average_duration(&self) -> Result<AverageDuration> {
        let tally = self.store.duration_tally().await?;
        Ok(AverageDuration {
            matches:         tally.matches,
            average_seconds: if tally.matches == 0 {
                0.0
            }
            else {
                tally.total_seconds as f64 / tally.matches as f64
            },
        })
    }

    pub async fn perk_pick_rates(&self) -> Result<PerkPickRates> {
        Ok(PerkPickRates {
            perks: self.store.perk_counts().await?,
        })
    }

    pub async fn win_rate_timeseries(&self, interval: BucketInterval, days: u32) -> Result<Vec<WinRatePoint>> {
        self.win_rate_timeseries_at(interval, days, Utc::now()).await
    }

    /// Sparse series: buckets without matches produce no point.
    pub async fn win_rate_timeseries_at(
        &self,
        interval: BucketInterval,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WinRatePoint>> {
        let outcomes = self.store.outcomes_since(window_start(now, days)?).await?;

        let mut buckets: BTreeMap<DateTime<Utc>, BucketTally> = BTreeMap::new();
        for outcome in outcomes {
            let tally = buckets.entry(bucket_start(outcome.created_at, interval)?).or_default();
            tally.matches += 1;
            if outcome.killer_win {
                tally.killer_wins += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, tally)| WinRatePoint {
                bucket,
                matches: tally.matches,
                killer_win_rate: ratio(tally.killer_wins, tally.matches),
            })
            .collect())
    }

    pub async fn perk_usage_timeseries(&self, interval: BucketInterval, days: u32) -> Result<Vec<PerkUsagePoint>> {
        self.perk_usage_timeseries_at(interval, days, Utc::now()).await
    }

    pub async fn perk_usage_timeseries_at(
        &self,
        interval: BucketInterval,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PerkUsagePoint>> {
        let uses = self.store.perk_uses_since(window_start(now, days)?).await?;

        let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, u64>> = BTreeMap::new();
        for perk_use in uses {
            *buckets
                .entry(bucket_start(perk_use.created_at, interval)?)
                .or_default()
                .entry(perk_use.perk)
                .or_default() += 1;
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, perks)| PerkUsagePoint { bucket, perks })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test::match_with_perks;
    use crate::test::sample_match;
    use crate::test::FakeStore;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn single_match_scenario() {
        let store = Arc::new(FakeStore::default());
        store
            .insert_match(
                &match_with_perks("A", true, 600, &["X", "Y"], &[&["Y", "Z"], &["X"], &[], &[]]),
                Utc::now(),
            )
            .await
            .unwrap();
        let engine = QueryEngine::new(store);

        let rate = engine.killer_win_rate().await.unwrap();
        assert_eq!(rate.killer_win_rate, 1.0);
        assert_eq!(rate.total_matches, 1);

        assert_eq!(engine.average_duration().await.unwrap().average_seconds, 600.0);

        let perks = engine.perk_pick_rates().await.unwrap();
        assert_eq!(perks.count_of("X"), 2);
        assert_eq!(perks.count_of("Y"), 2);
        assert_eq!(perks.count_of("Z"), 1);
    }

    #[tokio::test]
    async fn duplicated_perks_are_not_deduplicated() {
        let store = Arc::new(FakeStore::default());
        store
            .insert_match(
                &match_with_perks("A", false, 300, &["X", "X"], &[&["X"], &[], &[], &[]]),
                Utc::now(),
            )
            .await
            .unwrap();

        let perks = QueryEngine::new(store).perk_pick_rates().await.unwrap();
        assert_eq!(perks.count_of("X"), 3);
    }

    #[tokio::test]
    async fn empty_store_yields_zeroes() {
        let engine = QueryEngine::new(Arc::new(FakeStore::default()));
        let rate = engine.killer_win_rate().await.unwrap();
        assert_eq!((rate.total_matches, rate.killer_win_rate), (0, 0.0));
        assert_eq!(engine.average_duration().await.unwrap().average_seconds, 0.0);
        assert!(engine.perk_pick_rates().await.unwrap().perks.is_empty());
        assert!(engine
            .win_rate_timeseries(BucketInterval::Day, 7)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn two_of_three_rounds_to_two_thirds() {
        let store = Arc::new(FakeStore::default());
        for (id, won) in [("a", true), ("b", true), ("c", false)] {
            store.insert_match(&sample_match(id, won, 500), Utc::now()).await.unwrap();
        }
        let rate = QueryEngine::new(store).killer_win_rate().await.unwrap();
        assert_eq!(rate.rounded().killer_win_rate, 0.67);
    }

    #[tokio::test]
    async fn recency_window_excludes_old_matches() {
        let now = at(20, 12, 0);
        let store = Arc::new(FakeStore::default());
        for id in ["a", "b", "c"] {
            store
                .insert_match(&sample_match(id, true, 500), now - TimeDelta::days(10))
                .await
                .unwrap();
        }
        let engine = QueryEngine::new(store);

        let window = engine.recent_win_rate_at(7, now).await.unwrap();
        assert_eq!(window.total_matches, 0);
        assert_eq!(window.killer_win_rate, 0.0);

        assert_eq!(engine.killer_win_rate().await.unwrap().total_matches, 3);
    }

    #[tokio::test]
    async fn daily_buckets_count_exactly_and_ascend() {
        let now = at(20, 12, 0);
        let store = Arc::new(FakeStore::default());
        let stamps = [
            ("a", at(17, 0, 0), true),
            ("b", at(17, 23, 59), false),
            ("c", at(19, 8, 30), true),
            ("d", at(18, 1, 0), true),
            ("e", at(19, 23, 0), false),
            ("f", at(19, 0, 1), false),
            // Outside of the 7-day window.
            ("g", at(12, 0, 0), true),
        ];
        for (id, ts, won) in stamps {
            store.insert_match(&sample_match(id, won, 500), ts).await.unwrap();
        }

        let series = QueryEngine::new(store)
            .win_rate_timeseries_at(BucketInterval::Day, 7, now)
            .await
            .unwrap();

        let buckets = series.iter().map(|p| (p.bucket, p.matches)).collect::<Vec<_>>();
        assert_eq!(buckets, vec![(at(17, 0, 0), 2), (at(18, 0, 0), 1), (at(19, 0, 0), 3)]);
        assert!(series.windows(2).all(|w| w[0].bucket < w[1].bucket));
        assert_eq!(series[0].killer_win_rate, 0.5);
        assert_eq!(series[2].rounded().killer_win_rate, 0.333);
    }

    #[tokio::test]
    async fn hourly_perk_usage_is_grouped_per_bucket() {
        let now = at(20, 12, 0);
        let store = Arc::new(FakeStore::default());
        store
            .insert_match(&match_with_perks("a", true, 500, &["X"], &[&["Y"], &[], &[], &[]]), at(20, 9, 5))
            .await
            .unwrap();
        store
            .insert_match(&match_with_perks("b", true, 500, &["X"], &[&["X"], &[], &[], &[]]), at(20, 9, 55))
            .await
            .unwrap();
        store
            .insert_match(&match_with_perks("c", true, 500, &["Z"], &[&[], &[], &[], &[]]), at(20, 11, 0))
            .await
            .unwrap();

        let series = QueryEngine::new(store)
            .perk_usage_timeseries_at(BucketInterval::Hour, 1, now)
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].bucket, at(20, 9, 0));
        assert_eq!(series[0].perks.get("X"), Some(&3));
        assert_eq!(series[0].perks.get("Y"), Some(&1));
        assert_eq!(series[1].bucket, at(20, 11, 0));
        assert_eq!(series[1].perks.get("Z"), Some(&1));
    }

    #[tokio::test]
    async fn out_of_range_window_is_rejected() {
        let engine = QueryEngine::new(Arc::new(FakeStore::default()));

        assert!(matches!(
            engine.recent_win_rate(u32::MAX).await,
            Err(Error::InvalidParameter { name: "days", .. })
        ));
        assert!(engine.win_rate_timeseries(BucketInterval::Day, u32::MAX).await.is_err());
        assert!(engine.perk_usage_timeseries(BucketInterval::Hour, u32::MAX).await.is_err());
    }

    #[tokio::test]
    async fn recomputation_is_idempotent() {
        let store = Arc::new(FakeStore::default());
        for (id, won) in [("a", true), ("b", false), ("c", true)] {
            store.insert_match(&sample_match(id, won, 431), Utc::now()).await.unwrap();
        }
        let engine = QueryEngine::new(store);

        let first = serde_json::to_string(&engine.killer_win_rate().await.unwrap()).unwrap();
        let second = serde_json::to_string(&engine.killer_win_rate().await.unwrap()).unwrap();
        assert_eq!(first, second);

        let first = engine.win_rate_timeseries(BucketInterval::Hour, 1).await.unwrap();
        let second = engine.win_rate_timeseries(BucketInterval::Hour, 1).await.unwrap();
        assert_eq!(first, second);
    }
}
