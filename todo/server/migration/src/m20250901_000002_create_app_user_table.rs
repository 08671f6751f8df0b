use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum AppUser {
    #[sea_orm(iden = "AppUser")]
    Table,
    Id,
    Username,
    Email,
    FirstName,
    LastName,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

const IDX_APP_USER_USERNAME: &str = "idx-app_user-username";
const IDX_APP_USER_EMAIL: &str = "idx-app_user-email";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(pk_auto(AppUser::Id))
                    .col(string_len(AppUser::Username, 50))
                    .col(string_len(AppUser::Email, 100))
                    .col(string_len_null(AppUser::FirstName, 50))
                    .col(string_len_null(AppUser::LastName, 50))
                    .col(boolean(AppUser::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(AppUser::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(AppUser::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_APP_USER_USERNAME)
                    .table(AppUser::Table)
                    .col(AppUser::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_APP_USER_EMAIL)
                    .table(AppUser::Table)
                    .col(AppUser::Email)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_APP_USER_EMAIL)
                    .table(AppUser::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_APP_USER_USERNAME)
                    .table(AppUser::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await
    }
}
