//! Match ingestion gate.
//!
//! A submitted match is validated, persisted in a single store transaction, and only then is the write-invalidation
//! path signalled. The caller gets its acknowledgement without waiting for the invalidation to finish.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use garde::Validate;
use serde::Deserialize;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::instrument;

use crate::invalidation::Invalidator;
use crate::traits::AnalyticsCache;
use crate::traits::RecordStore;
use crate::types::Result;
use crate::types::Role;

pub const PLAYERS_PER_MATCH: usize = 5;
pub const SURVIVORS_PER_MATCH: usize = 4;
pub const MAX_PERKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewPlayer {
    #[garde(length(min = 1, max = 128))]
    pub player_id:  String,
    #[garde(skip)]
    pub role:       Role,
    #[garde(length(max = 4), inner(length(min = 1)))]
    #[serde(default)]
    pub perks_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewMatch {
    #[garde(length(min = 1, max = 128))]
    pub match_id:         String,
    #[garde(range(min = 1))]
    pub duration_seconds: i32,
    #[garde(skip)]
    pub killer_win:       bool,
    #[garde(dive, custom(roster))]
    pub players:          Vec<NewPlayer>,
}

// One killer, four survivors, no player twice.
#[allow(clippy::ptr_arg)]
fn roster(players: &Vec<NewPlayer>, _ctx: &()) -> garde::Result {
    if players.len() != PLAYERS_PER_MATCH {
        return Err(garde::Error::new(format!(
            "a match has exactly {PLAYERS_PER_MATCH} players, got {}",
            players.len()
        )));
    }

    let killers = players.iter().filter(|p| p.role == Role::Killer).count();
    let survivors = players.len() - killers;
    if killers != 1 || survivors != SURVIVORS_PER_MATCH {
        return Err(garde::Error::new(format!(
            "expected 1 killer and {SURVIVORS_PER_MATCH} survivors, got {killers} and {survivors}"
        )));
    }

    let mut seen = HashSet::with_capacity(players.len());
    if let Some(dup) = players.iter().find(|p| !seen.insert(p.player_id.as_str())) {
        return Err(garde::Error::new(format!("player '{}' appears twice", dup.player_id)));
    }

    Ok(())
}

/// Acknowledgement of a committed match.
#[derive(Debug)]
pub struct Ingested {
    pub match_id:     String,
    pub created_at:   DateTime<Utc>,
    /// The detached invalidation task. Dropping the handle does not cancel it.
    pub invalidation: JoinHandle<()>,
}

pub struct MatchIngest<S, C>
where
    S: RecordStore,
    C: AnalyticsCache,
{
    store:       Arc<S>,
    invalidator: Invalidator<C>,
}

impl<S, C> MatchIngest<S, C>
where
    S: RecordStore,
    C: AnalyticsCache,
{
    pub fn new(store: Arc<S>, invalidator: Invalidator<C>) -> Self {
        Self { store, invalidator }
    }

    /// Validate and persist a match, then submit cache invalidation in the background.
    ///
    /// A rejected or failed write never triggers invalidation. Invalidation outcome never affects the result.
    #[instrument(level = "debug", skip(self, new_match), fields(match_id = %new_match.match_id))]
    pub async fn ingest(&self, new_match: NewMatch) -> Result<Ingested> {
        new_match.validate()?;

        let created_at = Utc::now();
        self.store.insert_match(&new_match, created_at).await?;
        info!(match_id = %new_match.match_id, "match committed");

        Ok(Ingested {
            match_id: new_match.match_id,
            created_at,
            invalidation: self.invalidator.spawn(),
        })
    }
}
