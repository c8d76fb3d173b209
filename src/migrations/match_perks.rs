use sea_orm_migration::prelude::*;

use super::match_players::MatchPlayers;
use super::matches::Matches;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "match_perks_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MatchPerks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MatchPerks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MatchPerks::MatchId).string_len(128).not_null())
                    .col(ColumnDef::new(MatchPerks::PlayerId).integer().not_null())
                    .col(ColumnDef::new(MatchPerks::Slot).integer().not_null())
                    .col(ColumnDef::new(MatchPerks::Perk).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-match_perks-match_id")
                            .from(MatchPerks::Table, MatchPerks::MatchId)
                            .to(Matches::Table, Matches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-match_perks-player_id")
                            .from(MatchPerks::Table, MatchPerks::PlayerId)
                            .to(MatchPlayers::Table, MatchPlayers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-match_perks-perk")
                    .table(MatchPerks::Table)
                    .col(MatchPerks::Perk)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-match_perks-match_id")
                    .table(MatchPerks::Table)
                    .col(MatchPerks::MatchId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MatchPerks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MatchPerks {
    Table,
    Id,
    MatchId,
    PlayerId,
    Slot,
    Perk,
}
