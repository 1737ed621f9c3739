use std::sync::Arc;

use serde::de::DeserializeOwned;
use worker::{Env, Request};

use crate::caching::TagCache;
use crate::context::AppContext;
use crate::error::Error;
use crate::mail::{Mailer, NoopMailer};
use crate::media::MediaStore;
use crate::worker_wasm::brevo::BrevoMailer;
use crate::worker_wasm::db::db_connect;
use crate::worker_wasm::env::app_config;
use crate::worker_wasm::r2::R2MediaStore;

pub mod actions;
pub mod admin_auth;
pub mod auth;
pub mod data;
pub mod media;
pub mod migrations;
pub mod transfer;

pub async fn app_context(env: &Env) -> worker::Result<AppContext> {
    let config = app_config(env);
    let db = db_connect(env).await?;
    // Isolates share nothing, so a cache outliving the request could not see
    // another isolate's revalidations.
    let cache = Arc::new(TagCache::new(config.cache_revalidate_seconds));

    let mailer: Arc<dyn Mailer> = match BrevoMailer::from_env(env) {
        Some(brevo) => Arc::new(brevo),
        None => {
            tracing::warn!("BREVO_API_KEY or BREVO_SENDER_EMAIL missing; emails are dropped");
            Arc::new(NoopMailer)
        }
    };
    let media: Arc<dyn MediaStore> = Arc::new(R2MediaStore::from_env(env, &config)?);

    Ok(AppContext::new(db, cache, mailer, media, config))
}

/// JSON request body; an empty body deserializes as `{}`.
pub async fn read_json<T: DeserializeOwned>(req: &mut Request) -> crate::error::Result<T> {
    let text = req
        .text()
        .await
        .map_err(|_| Error::invalid("Unreadable request body"))?;
    let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
    parse_json(serde_json::from_str(text).map_err(|e| Error::invalid(format!("Invalid JSON body: {e}")))?)
}

pub fn parse_json<T: DeserializeOwned>(value: serde_json::Value) -> crate::error::Result<T> {
    serde_json::from_value(value).map_err(|e| Error::invalid(format!("Invalid input: {e}")))
}
