use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use sea_orm::DeriveActiveEnum;
use sea_orm::sea_query::StringLen;
use sea_orm::EnumIter;
use serde::Deserialize;
use serde::Serialize;

/// The longest history, in days, any windowed or bucketed query may cover.
pub const MAX_DAYS: u32 = 3650;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("cache backend '{backend}' failed: {message}")]
    Cache { backend: String, message: String },

    #[error("cache operation on '{key}' timed out")]
    CacheTimeout { key: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("match '{0}' already exists")]
    DuplicateMatch(String),

    #[error("match rejected: {0}")]
    Rejected(#[from] garde::Report),

    #[error("timestamp cannot be bucketed: {0}")]
    Rounding(#[from] chrono::RoundingError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors handed over to observers are shared between the reporting task and whoever listens.
pub type SharedError = Arc<Error>;

impl Error {
    pub fn cache<B: ToString, M: ToString>(backend: B, message: M) -> Self {
        Self::Cache {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid(name: &'static str, reason: impl ToString) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.to_string(),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[sea_orm(string_value = "killer")]
    Killer,
    #[sea_orm(string_value = "survivor")]
    Survivor,
}

/// Width of a time-series bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BucketInterval {
    Hour,
    Day,
}

impl BucketInterval {
    pub fn width(&self) -> TimeDelta {
        match self {
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
        }
    }

    /// Parse a query-string value; anything but `hour` or `day` is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| Error::invalid("interval", format!("unsupported bucket interval '{value}'")))
    }
}

/// Reject a `days` parameter outside of `1..=MAX_DAYS`.
pub fn validate_days(days: u32) -> Result<u32> {
    if days == 0 || days > MAX_DAYS {
        Err(Error::invalid("days", format!("must be between 1 and {MAX_DAYS}, got {days}")))
    }
    else {
        Ok(days)
    }
}

/// Round for presentation. Never used on values that are cached or fed into further computation.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Guarded ratio: an empty denominator yields 0.
pub(crate) fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    }
    else {
        numerator as f64 / denominator as f64
    }
}

/// Raw match counts as returned by the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchTally {
    pub total:       u64,
    pub killer_wins: u64,
}

/// Sum of match durations and the number of matches summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationTally {
    pub total_seconds: i64,
    pub matches:       u64,
}

/// One match's outcome with its creation time; input of the win-rate series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub created_at: DateTime<Utc>,
    pub killer_win: bool,
}

/// One perk occurrence with the creation time of the match it was used in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerkUse {
    pub created_at: DateTime<Utc>,
    pub perk:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRate {
    pub total_matches:     u64,
    pub killer_wins:       u64,
    pub killer_win_rate:   f64,
    pub survivor_win_rate: f64,
}

impl WinRate {
    pub fn from_tally(tally: MatchTally) -> Self {
        let killer_win_rate = ratio(tally.killer_wins, tally.total);
        Self {
            total_matches: tally.total,
            killer_wins: tally.killer_wins,
            killer_win_rate,
            survivor_win_rate: if tally.total == 0 { 0.0 } else { 1.0 - killer_win_rate },
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            killer_win_rate: round_to(self.killer_win_rate, 2),
            survivor_win_rate: round_to(self.survivor_win_rate, 2),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageDuration {
    pub matches:         u64,
    pub average_seconds: f64,
}

impl AverageDuration {
    pub fn rounded(&self) -> Self {
        Self {
            matches:         self.matches,
            average_seconds: round_to(self.average_seconds, 2),
        }
    }
}

/// Occurrences of every perk across all participation records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkPickRates {
    pub perks: BTreeMap<String, u64>,
}

impl PerkPickRates {
    pub fn count_of(&self, perk: &str) -> u64 {
        self.perks.get(perk).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRatePoint {
    pub bucket:          DateTime<Utc>,
    pub matches:         u64,
    pub killer_win_rate: f64,
}

impl WinRatePoint {
    pub fn rounded(&self) -> Self {
        Self {
            killer_win_rate: round_to(self.killer_win_rate, 3),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerkUsagePoint {
    pub bucket: DateTime<Utc>,
    pub perks:  BTreeMap<String, u64>,
}
