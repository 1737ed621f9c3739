use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organisations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Organisations::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Organisations::Name).string().not_null())
                    .col(ColumnDef::new(Organisations::Address).string())
                    .col(ColumnDef::new(Organisations::Phone).string())
                    .col(ColumnDef::new(Organisations::Email).string())
                    .col(ColumnDef::new(Organisations::Website).string())
                    .col(
                        ColumnDef::new(Organisations::CompletedOnboarding)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Organisations::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Organisations::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Users::OrganisationId).string().not_null())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string())
                    .col(ColumnDef::new(Users::PasswordSalt).string())
                    .col(ColumnDef::new(Users::Role).string().not_null().default("MEMBER"))
                    .col(ColumnDef::new(Users::Locale).string().not_null().default("en-US"))
                    .col(ColumnDef::new(Users::Phone).string())
                    .col(ColumnDef::new(Users::Image).string())
                    .col(
                        ColumnDef::new(Users::CompletedOnboarding)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::LastLogin).big_integer())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_organisation_id")
                            .from(Users::Table, Users::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_organisation_id")
                    .table(Users::Table)
                    .col(Users::OrganisationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::UserId).string().not_null())
                    .col(ColumnDef::new(Sessions::Token).string().not_null().unique_key())
                    .col(ColumnDef::new(Sessions::ExpiresAt).big_integer().not_null())
                    .col(ColumnDef::new(Sessions::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_user_id")
                            .from(Sessions::Table, Sessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Invitations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invitations::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Invitations::OrganisationId).string().not_null())
                    .col(ColumnDef::new(Invitations::Token).string().not_null().unique_key())
                    .col(ColumnDef::new(Invitations::Email).string().not_null())
                    .col(ColumnDef::new(Invitations::Role).string().not_null().default("MEMBER"))
                    .col(
                        ColumnDef::new(Invitations::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Invitations::LastSentAt).big_integer())
                    .col(ColumnDef::new(Invitations::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Invitations::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invitations_organisation_id")
                            .from(Invitations::Table, Invitations::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invitations_organisation_email")
                    .table(Invitations::Table)
                    .col(Invitations::OrganisationId)
                    .col(Invitations::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApiKeys::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ApiKeys::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ApiKeys::OrganisationId).string().not_null())
                    .col(ColumnDef::new(ApiKeys::Description).string().not_null())
                    .col(ColumnDef::new(ApiKeys::HashedKey).string().not_null().unique_key())
                    .col(ColumnDef::new(ApiKeys::ExpiresAt).big_integer())
                    .col(ColumnDef::new(ApiKeys::LastUsedAt).big_integer())
                    .col(ColumnDef::new(ApiKeys::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_api_keys_organisation_id")
                            .from(ApiKeys::Table, ApiKeys::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Webhooks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Webhooks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Webhooks::OrganisationId).string().not_null())
                    .col(ColumnDef::new(Webhooks::Url).string().not_null())
                    .col(ColumnDef::new(Webhooks::Triggers).text().not_null().default("[]"))
                    .col(ColumnDef::new(Webhooks::Secret).string())
                    .col(ColumnDef::new(Webhooks::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Webhooks::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_webhooks_organisation_id")
                            .from(Webhooks::Table, Webhooks::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkHours::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkHours::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(WorkHours::OrganisationId).string().not_null())
                    .col(ColumnDef::new(WorkHours::DayOfWeek).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_hours_organisation_id")
                            .from(WorkHours::Table, WorkHours::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WorkTimeSlots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkTimeSlots::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(WorkTimeSlots::WorkHoursId).string().not_null())
                    .col(ColumnDef::new(WorkTimeSlots::Start).integer().not_null())
                    .col(ColumnDef::new(WorkTimeSlots::End).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_time_slots_work_hours_id")
                            .from(WorkTimeSlots::Table, WorkTimeSlots::WorkHoursId)
                            .to(WorkHours::Table, WorkHours::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Feedback::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Feedback::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Feedback::OrganisationId).string().not_null())
                    .col(ColumnDef::new(Feedback::UserId).string())
                    .col(ColumnDef::new(Feedback::Category).string().not_null())
                    .col(ColumnDef::new(Feedback::Message).text().not_null())
                    .col(ColumnDef::new(Feedback::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feedback_organisation_id")
                            .from(Feedback::Table, Feedback::OrganisationId)
                            .to(Organisations::Table, Organisations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feedback_user_id")
                            .from(Feedback::Table, Feedback::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Best-effort rollback, children first.
        let _ = manager.drop_table(Table::drop().table(Feedback::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(WorkTimeSlots::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(WorkHours::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Webhooks::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ApiKeys::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Invitations::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Sessions::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Users::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Organisations::Table).to_owned()).await;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Organisations {
    Table,
    Id,
    Name,
    Address,
    Phone,
    Email,
    Website,
    CompletedOnboarding,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Users {
    Table,
    Id,
    OrganisationId,
    Name,
    Email,
    PasswordHash,
    PasswordSalt,
    Role,
    Locale,
    Phone,
    Image,
    CompletedOnboarding,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    Token,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Invitations {
    Table,
    Id,
    OrganisationId,
    Token,
    Email,
    Role,
    Status,
    LastSentAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiKeys {
    Table,
    Id,
    OrganisationId,
    Description,
    HashedKey,
    ExpiresAt,
    LastUsedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Webhooks {
    Table,
    Id,
    OrganisationId,
    Url,
    Triggers,
    Secret,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WorkHours {
    Table,
    Id,
    OrganisationId,
    DayOfWeek,
}

#[derive(DeriveIden)]
enum WorkTimeSlots {
    Table,
    Id,
    WorkHoursId,
    Start,
    End,
}

#[derive(DeriveIden)]
enum Feedback {
    Table,
    Id,
    OrganisationId,
    UserId,
    Category,
    Message,
    CreatedAt,
}
