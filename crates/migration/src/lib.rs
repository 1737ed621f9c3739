pub use sea_orm_migration::prelude::*;

mod m20260301_000001_tenancy_tables;
mod m20260301_000002_contact_tables;
mod m20260302_000003_pinned;
mod m20260303_000004_password_iterations;

pub struct Migrator;

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_tenancy_tables::Migration),
            Box::new(m20260301_000002_contact_tables::Migration),
            Box::new(m20260302_000003_pinned::Migration),
            Box::new(m20260303_000004_password_iterations::Migration),
        ]
    }
}
