//! Create votes table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Votes::UserId).integer().not_null())
                    .col(ColumnDef::new(Votes::PolicyId).integer().not_null())
                    .col(ColumnDef::new(Votes::Stance).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Votes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_user")
                            .from(Votes::Table, Votes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_policy")
                            .from(Votes::Table, Votes::PolicyId)
                            .to(Policies::Table, Policies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, policy_id) - one vote per user per policy
        manager
            .create_index(
                Index::create()
                    .name("uq_vote_user_policy")
                    .table(Votes::Table)
                    .col(Votes::UserId)
                    .col(Votes::PolicyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (policy_id, stance) (for grouped tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_policy_stance")
                    .table(Votes::Table)
                    .col(Votes::PolicyId)
                    .col(Votes::Stance)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Votes {
    Table,
    Id,
    UserId,
    PolicyId,
    Stance,
    CreatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum Policies {
    Table,
    Id,
}
