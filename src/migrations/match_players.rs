use sea_orm_migration::prelude::*;

use super::matches::Matches;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "match_players_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MatchPlayers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MatchPlayers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MatchPlayers::MatchId).string_len(128).not_null())
                    .col(ColumnDef::new(MatchPlayers::PlayerId).string_len(128).not_null())
                    .col(ColumnDef::new(MatchPlayers::Role).string_len(16).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-match_players-match_id")
                            .from(MatchPlayers::Table, MatchPlayers::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-match_players-match_player")
                    .table(MatchPlayers::Table)
                    .col(MatchPlayers::MatchId)
                    .col(MatchPlayers::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MatchPlayers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(crate) enum MatchPlayers {
    Table,
    Id,
    MatchId,
    PlayerId,
    Role,
}
