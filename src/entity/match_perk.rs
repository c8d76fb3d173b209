use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

/// One perk slot of one player. A perk listed twice by the same player is stored twice.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[sea_orm(table_name = "match_perks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:        i32,
    // Denormalized from the player row so per-match scans skip a join.
    pub match_id:  String,
    pub player_id: i32,
    pub slot:      i32,
    #[sea_orm(indexed)]
    pub perk:      String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::match_record::Entity",
        from = "Column::MatchId",
        to = "super::match_record::Column::Id"
    )]
    Match,
    #[sea_orm(
        belongs_to = "super::match_player::Entity",
        from = "Column::PlayerId",
        to = "super::match_player::Column::Id"
    )]
    Player,
}

impl ActiveModelBehavior for ActiveModel {}
