//! Create policies table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Policies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Policies::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Policies::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Policies::Description).text().not_null())
                    .col(ColumnDef::new(Policies::Category).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Policies::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Policies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Policies::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Policies::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Policies::AiSummary).text().null())
                    .col(
                        ColumnDef::new(Policies::Pros)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Policies::Cons)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Policies::AuthorId).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_policies_author")
                            .from(Policies::Table, Policies::AuthorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: category (for filtered listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_policies_category")
                    .table(Policies::Table)
                    .col(Policies::Category)
                    .to_owned(),
            )
            .await?;

        // Index: (is_active, created_at) (for the active listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_policies_active_created_at")
                    .table(Policies::Table)
                    .col(Policies::IsActive)
                    .col(Policies::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Policies::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Policies {
    Table,
    Id,
    Title,
    Description,
    Category,
    IsActive,
    CreatedAt,
    UpdatedAt,
    EndsAt,
    AiSummary,
    Pros,
    Cons,
    AuthorId,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
