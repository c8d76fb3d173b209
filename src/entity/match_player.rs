use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

use crate::types::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[sea_orm(table_name = "match_players")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:        i32,
    pub match_id:  String,
    pub player_id: String,
    pub role:      Role,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::match_record::Entity",
        from = "Column::MatchId",
        to = "super::match_record::Column::Id"
    )]
    Match,
}

impl ActiveModelBehavior for ActiveModel {}
