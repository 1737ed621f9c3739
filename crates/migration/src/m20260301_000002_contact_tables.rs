use sea_orm_migration::prelude::*;

use crate::m20260301_000001_tenancy_tables::{Organisations, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

fn contact_fk(
    name: &str,
    table: impl IntoIden + 'static,
    col: impl IntoIden + 'static,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, col)
        .to(Contacts::Table, Contacts::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::Cascade)
        .to_owned()
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contacts::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Contacts::OrganisationId).string().not_null())
                    .col(ColumnDef::new(Contacts::Record).string().not_null().default("PERSON"))
                    .col(ColumnDef::new(Contacts::Image).string())
                    .col(ColumnDef::new(Contacts::Salutation).string())
                    .col(ColumnDef::new(Contacts::FirstName).string())
                    .col(ColumnDef::new(Contacts::LastName).string())
                    .col(ColumnDef::new(Contacts::CompanyName).string())
                    .col(ColumnDef::new(Contacts::Email).string())
                    .col(ColumnDef::new(Contacts::Phone1).string())
                    .col(ColumnDef::new(Contacts::Phone2).string())
                    .col(ColumnDef::new(Contacts::Address).string())
                    .col(ColumnDef::new(Contacts::CompanyRegistrationNumber).string())
                    .col(ColumnDef::new(Contacts::Stage).string().not_null().default("LEAD"))
                    .col(ColumnDef::new(Contacts::Archived).boolean().not_null().default(false))
                    .col(ColumnDef::new(Contacts::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Contacts::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_organisation_id")
                            .from(Contacts::Table, Contacts::OrganisationId)
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
                    .name("idx_contacts_organisation_id")
                    .table(Contacts::Table)
                    .col(Contacts::OrganisationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactTags::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactTags::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactTags::Text).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactTagLinks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactTagLinks::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactTagLinks::TagId).string().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_contact_tag_links")
                            .col(ContactTagLinks::ContactId)
                            .col(ContactTagLinks::TagId),
                    )
                    .foreign_key(&mut contact_fk(
                        "fk_contact_tag_links_contact_id",
                        ContactTagLinks::Table,
                        ContactTagLinks::ContactId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_tag_links_tag_id")
                            .from(ContactTagLinks::Table, ContactTagLinks::TagId)
                            .to(ContactTags::Table, ContactTags::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactTasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactTasks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactTasks::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactTasks::Title).string().not_null())
                    .col(ColumnDef::new(ContactTasks::Description).text())
                    .col(ColumnDef::new(ContactTasks::Status).string().not_null().default("OPEN"))
                    .col(ColumnDef::new(ContactTasks::DueDate).big_integer())
                    .col(ColumnDef::new(ContactTasks::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(ContactTasks::UpdatedAt).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_tasks_contact_id",
                        ContactTasks::Table,
                        ContactTasks::ContactId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactNotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactNotes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactNotes::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactNotes::UserId).string())
                    .col(ColumnDef::new(ContactNotes::Text).text())
                    .col(ColumnDef::new(ContactNotes::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(ContactNotes::UpdatedAt).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_notes_contact_id",
                        ContactNotes::Table,
                        ContactNotes::ContactId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_notes_user_id")
                            .from(ContactNotes::Table, ContactNotes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactComments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactComments::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactComments::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactComments::UserId).string().not_null())
                    .col(ColumnDef::new(ContactComments::Text).text().not_null())
                    .col(ColumnDef::new(ContactComments::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(ContactComments::UpdatedAt).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_comments_contact_id",
                        ContactComments::Table,
                        ContactComments::ContactId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_comments_user_id")
                            .from(ContactComments::Table, ContactComments::UserId)
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
                    .table(ContactPageVisits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactPageVisits::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactPageVisits::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactPageVisits::UserId).string())
                    .col(ColumnDef::new(ContactPageVisits::Timestamp).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_page_visits_contact_id",
                        ContactPageVisits::Table,
                        ContactPageVisits::ContactId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_page_visits_user_id")
                            .from(ContactPageVisits::Table, ContactPageVisits::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contact_page_visits_contact_timestamp")
                    .table(ContactPageVisits::Table)
                    .col(ContactPageVisits::ContactId)
                    .col(ContactPageVisits::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactActivities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactActivities::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactActivities::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactActivities::ActionType).string().not_null())
                    .col(ColumnDef::new(ContactActivities::ActorId).string().not_null())
                    .col(ColumnDef::new(ContactActivities::Metadata).text())
                    .col(ColumnDef::new(ContactActivities::OccurredAt).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_activities_contact_id",
                        ContactActivities::Table,
                        ContactActivities::ContactId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactMedia::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContactMedia::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(ContactMedia::ContactId).string().not_null())
                    .col(ColumnDef::new(ContactMedia::FileName).string().not_null())
                    .col(ColumnDef::new(ContactMedia::FileSize).big_integer().not_null())
                    .col(ColumnDef::new(ContactMedia::FileType).string().not_null())
                    .col(ColumnDef::new(ContactMedia::FileUrl).string().not_null())
                    .col(ColumnDef::new(ContactMedia::CreatedAt).big_integer().not_null())
                    .foreign_key(&mut contact_fk(
                        "fk_contact_media_contact_id",
                        ContactMedia::Table,
                        ContactMedia::ContactId,
                    ))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Best-effort rollback, children first.
        let _ = manager.drop_table(Table::drop().table(ContactMedia::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactActivities::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactPageVisits::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactComments::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactNotes::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactTasks::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactTagLinks::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(ContactTags::Table).to_owned()).await;
        let _ = manager.drop_table(Table::drop().table(Contacts::Table).to_owned()).await;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Contacts {
    Table,
    Id,
    OrganisationId,
    Record,
    Image,
    Salutation,
    FirstName,
    LastName,
    CompanyName,
    Email,
    Phone1,
    Phone2,
    Address,
    CompanyRegistrationNumber,
    Stage,
    Archived,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContactTags {
    Table,
    Id,
    Text,
}

#[derive(DeriveIden)]
enum ContactTagLinks {
    Table,
    ContactId,
    TagId,
}

#[derive(DeriveIden)]
enum ContactTasks {
    Table,
    Id,
    ContactId,
    Title,
    Description,
    Status,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContactNotes {
    Table,
    Id,
    ContactId,
    UserId,
    Text,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContactComments {
    Table,
    Id,
    ContactId,
    UserId,
    Text,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContactPageVisits {
    Table,
    Id,
    ContactId,
    UserId,
    Timestamp,
}

#[derive(DeriveIden)]
enum ContactActivities {
    Table,
    Id,
    ContactId,
    ActionType,
    ActorId,
    Metadata,
    OccurredAt,
}

#[derive(DeriveIden)]
enum ContactMedia {
    Table,
    Id,
    ContactId,
    FileName,
    FileSize,
    FileType,
    FileUrl,
    CreatedAt,
}
