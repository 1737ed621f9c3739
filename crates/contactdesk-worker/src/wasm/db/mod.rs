use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection, DbBackend, ProxyDatabaseTrait};
use worker::{Env, Error, Result};

use super::env::env_string;

mod libsql;

pub use libsql::LibsqlHttp;

fn map_db_err(e: sea_orm::DbErr) -> Error {
    Error::RustError(e.to_string())
}

pub async fn db_connect(env: &Env) -> Result<DatabaseConnection> {
    let url = env_string(env, "LIBSQL_URL").ok_or_else(|| {
        Error::RustError("LIBSQL_URL is required for libsql connections".to_string())
    })?;

    let client: Box<dyn ProxyDatabaseTrait> =
        Box::new(LibsqlHttp::new(&url, env_string(env, "LIBSQL_AUTH_TOKEN")));
    Database::connect_proxy(DbBackend::Sqlite, Arc::new(client))
        .await
        .map_err(map_db_err)
}
