use sea_orm_migration::prelude::*;

use crate::m20260301_000001_tenancy_tables::Users;
use crate::m20260301_000002_contact_tables::Contacts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Per-user pinned contacts with a dense display order.
        manager
            .create_table(
                Table::create()
                    .table(Pinned::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Pinned::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Pinned::UserId).string().not_null())
                    .col(ColumnDef::new(Pinned::ContactId).string().not_null())
                    .col(ColumnDef::new(Pinned::Order).integer().not_null().default(0))
                    .col(ColumnDef::new(Pinned::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pinned_user_id")
                            .from(Pinned::Table, Pinned::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pinned_contact_id")
                            .from(Pinned::Table, Pinned::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pinned_user_contact")
                    .table(Pinned::Table)
                    .col(Pinned::UserId)
                    .col(Pinned::ContactId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let _ = manager
            .drop_index(Index::drop().name("idx_pinned_user_contact").to_owned())
            .await;
        let _ = manager
            .drop_table(Table::drop().table(Pinned::Table).to_owned())
            .await;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Pinned {
    Table,
    Id,
    UserId,
    ContactId,
    Order,
    CreatedAt,
}
