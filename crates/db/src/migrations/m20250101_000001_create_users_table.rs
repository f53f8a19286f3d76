//! Create users table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::DeviceId).string_len(255).null())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    .col(ColumnDef::new(Users::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Users::AvatarUrl).string_len(512).null())
                    .col(
                        ColumnDef::new(Users::AuthProvider)
                            .string_len(16)
                            .not_null()
                            .default("device"),
                    )
                    .col(
                        ColumnDef::new(Users::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::PushToken).text().null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::LastLoginAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .check(
                        Expr::col(Users::DeviceId)
                            .is_not_null()
                            .or(Expr::col(Users::Email).is_not_null()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: device_id (NULLs do not collide)
        manager
            .create_index(
                Index::create()
                    .name("uq_users_device_id")
                    .table(Users::Table)
                    .col(Users::DeviceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: email
        manager
            .create_index(
                Index::create()
                    .name("uq_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    DeviceId,
    Email,
    Name,
    AvatarUrl,
    AuthProvider,
    IsVerified,
    PushToken,
    CreatedAt,
    LastLoginAt,
    UpdatedAt,
}
