use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "matches_migration"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Matches::Id).string_len(128).not_null().primary_key())
                    .col(ColumnDef::new(Matches::DurationSeconds).integer().not_null())
                    .col(ColumnDef::new(Matches::KillerWin).boolean().not_null())
                    .col(ColumnDef::new(Matches::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-matches-created_at")
                    .table(Matches::Table)
                    .col(Matches::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Matches::Table).to_owned()).await
    }
}

#[derive(Iden)]
pub(crate) enum Matches {
    Table,
    Id,
    DurationSeconds,
    KillerWin,
    CreatedAt,
}
