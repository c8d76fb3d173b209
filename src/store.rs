//! Relational record store on top of sea-orm.
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::Func;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use sea_orm::ColumnTrait;
use sea_orm::DatabaseConnection;
use sea_orm::DatabaseTransaction;
use sea_orm::DbErr;
use sea_orm::EntityTrait;
use sea_orm::JoinType;
use sea_orm::QueryFilter;
use sea_orm::QueryOrder;
use sea_orm::QuerySelect;
use sea_orm::RelationTrait;
use sea_orm::SqlErr;
use sea_orm::TransactionTrait;
use sea_orm_migration::MigratorTrait;
use tracing::debug;
use tracing::instrument;

use crate::driver::DatabaseDriver;
use crate::entity::match_perk;
use crate::entity::match_player;
use crate::entity::match_record;
use crate::ingest::NewMatch;
use crate::migrations::Migrator;
use crate::traits::RecordStore;
use crate::types::DurationTally;
use crate::types::Error;
use crate::types::MatchOutcome;
use crate::types::MatchTally;
use crate::types::PerkUse;
use crate::types::Result;

#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    connection: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    pub fn from_driver(driver: &dyn DatabaseDriver) -> Self {
        Self::new(driver.connection())
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Bring the schema up to date.
    pub async fn migrate(&self) -> Result<()> {
        Migrator::up(&self.connection, None).await?;
        Ok(())
    }

    async fn write_match(txn: &DatabaseTransaction, new_match: &NewMatch, created_at: DateTime<Utc>) -> Result<()> {
        match_record::Entity::insert(match_record::ActiveModel {
            id:               Set(new_match.match_id.clone()),
            duration_seconds: Set(new_match.duration_seconds),
            killer_win:       Set(new_match.killer_win),
            created_at:       Set(created_at),
        })
        .exec_without_returning(txn)
        .await
        .map_err(|err| duplicate_or_db(err, &new_match.match_id))?;

        for player in &new_match.players {
            let player_row = match_player::Entity::insert(match_player::ActiveModel {
                id:        NotSet,
                match_id:  Set(new_match.match_id.clone()),
                player_id: Set(player.player_id.clone()),
                role:      Set(player.role),
            })
            .exec(txn)
            .await?
            .last_insert_id;

            let perks = player
                .perks_used
                .iter()
                .enumerate()
                .map(|(slot, perk)| match_perk::ActiveModel {
                    id:        NotSet,
                    match_id:  Set(new_match.match_id.clone()),
                    player_id: Set(player_row),
                    slot:      Set(slot as i32),
                    perk:      Set(perk.clone()),
                })
                .collect::<Vec<_>>();

            if !perks.is_empty() {
                match_perk::Entity::insert_many(perks)
                    .exec_without_returning(txn)
                    .await?;
            }
        }

        Ok(())
    }
}

fn duplicate_or_db(err: DbErr, match_id: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateMatch(match_id.to_string()),
        _ => Error::Db(err),
    }
}

#[async_trait]
impl RecordStore for SeaOrmStore {
    #[instrument(level = "debug", skip(self, new_match), fields(match_id = %new_match.match_id))]
    async fn insert_match(&self, new_match: &NewMatch, created_at: DateTime<Utc>) -> Result<()> {
        let txn = self.connection.begin().await?;

        // Dropping an uncommitted transaction rolls it back, so an early return leaves nothing behind.
        Self::write_match(&txn, new_match, created_at).await?;
        txn.commit().await?;

        debug!(players = new_match.players.len(), "match stored");
        Ok(())
    }

    async fn match_tally(&self, since: Option<DateTime<Utc>>) -> Result<MatchTally> {
        let mut query = match_record::Entity::find();
        if let Some(since) = since {
            query = query.filter(match_record::Column::CreatedAt.gte(since));
        }

        // Both counts come from one statement so they always describe the same set of rows.
        let (total, killer_wins) = query
            .select_only()
            .column_as(match_record::Column::Id.count(), "total")
            .column_as(
                SimpleExpr::from(Func::sum(Expr::case(match_record::Column::KillerWin.eq(true), 1).finally(0))),
                "killer_wins",
            )
            .into_tuple::<(i64, Option<i64>)>()
            .one(&self.connection)
            .await?
            .unwrap_or((0, None));

        Ok(MatchTally {
            total:       total as u64,
            killer_wins: killer_wins.unwrap_or(0) as u64,
        })
    }

    async fn duration_tally(&self) -> Result<DurationTally> {
        let (total_seconds, matches) = match_record::Entity::find()
            .select_only()
            .column_as(match_record::Column::DurationSeconds.sum(), "total_seconds")
            .column_as(match_record::Column::Id.count(), "matches")
            .into_tuple::<(Option<i64>, i64)>()
            .one(&self.connection)
            .await?
            .unwrap_or((None, 0));

        Ok(DurationTally {
            total_seconds: total_seconds.unwrap_or(0),
            matches:       matches as u64,
        })
    }

    async fn perk_counts(&self) -> Result<BTreeMap<String, u64>> {
        let counts = match_perk::Entity::find()
            .select_only()
            .column(match_perk::Column::Perk)
            .column_as(match_perk::Column::Id.count(), "uses")
            .group_by(match_perk::Column::Perk)
            .into_tuple::<(String, i64)>()
            .all(&self.connection)
            .await?;

        Ok(counts.into_iter().map(|(perk, uses)| (perk, uses as u64)).collect())
    }

    async fn outcomes_since(&self, since: DateTime<Utc>) -> Result<Vec<MatchOutcome>> {
        let rows = match_record::Entity::find()
            .filter(match_record::Column::CreatedAt.gte(since))
            .select_only()
            .column(match_record::Column::CreatedAt)
            .column(match_record::Column::KillerWin)
            .order_by_asc(match_record::Column::CreatedAt)
            .into_tuple::<(DateTime<Utc>, bool)>()
            .all(&self.connection)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(created_at, killer_win)| MatchOutcome { created_at, killer_win })
            .collect())
    }

    async fn perk_uses_since(&self, since: DateTime<Utc>) -> Result<Vec<PerkUse>> {
        let rows = match_perk::Entity::find()
            .join(JoinType::InnerJoin, match_perk::Relation::Match.def())
            .filter(match_record::Column::CreatedAt.gte(since))
            .select_only()
            .column(match_record::Column::CreatedAt)
            .column(match_perk::Column::Perk)
            .order_by_asc(match_record::Column::CreatedAt)
            .into_tuple::<(DateTime<Utc>, String)>()
            .all(&self.connection)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(created_at, perk)| PerkUse { created_at, perk })
            .collect())
    }
}
