//! Organisation API keys. Only the SHA-256 of a key is stored; the plaintext is
//! returned once, at creation.

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tracing::{debug, info};
use validator::Validate;

use entity::api_key;

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::crypto::{generate_api_key, hash_api_key};
use crate::error::{Error, Result};
use crate::schemas::developers::CreateApiKeyInput;
use crate::schemas::IdInput;
use crate::session::Session;
use crate::util::{now_ts, start_of_day, uuid_v4};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApiKey {
    pub id: String,
    pub api_key: String,
}

pub async fn create_api_key(ctx: &AppContext, session: &Session, input: CreateApiKeyInput) -> Result<CreatedApiKey> {
    input.validate()?;

    let now = now_ts();
    let expires_at = if input.never_expires {
        None
    } else {
        Some(start_of_day(input.expires_at.unwrap_or(now)))
    };

    let plaintext = generate_api_key()?;
    let created = api_key::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(session.organisation_id.clone()),
        description: Set(input.description),
        hashed_key: Set(hash_api_key(&plaintext)),
        expires_at: Set(expires_at),
        last_used_at: Set(None),
        created_at: Set(now),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ApiKeys, &[])?;
    info!(api_key_id = %created.id, "api key created");
    Ok(CreatedApiKey {
        id: created.id,
        api_key: plaintext,
    })
}

pub async fn revoke_api_key(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;

    let result = api_key::Entity::delete_many()
        .filter(api_key::Column::Id.eq(&input.id))
        .filter(api_key::Column::OrganisationId.eq(&session.organisation_id))
        .exec(&ctx.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound("API key"));
    }

    ctx.revalidate_organisation(session, OrganisationCacheKey::ApiKeys, &[])
}

/// Resolve a plaintext key to its organisation id and record its use.
pub async fn verify_api_key(ctx: &AppContext, plaintext: &str) -> Result<String> {
    let invalid = || Error::Unauthorized("Invalid API key".to_string());

    let key = api_key::Entity::find()
        .filter(api_key::Column::HashedKey.eq(hash_api_key(plaintext.trim())))
        .one(&ctx.db)
        .await?
        .ok_or_else(invalid)?;

    let now = now_ts();
    if key.expires_at.is_some_and(|at| at <= now) {
        debug!(api_key_id = %key.id, "api key expired");
        return Err(Error::Unauthorized("API key expired".to_string()));
    }

    api_key::Entity::update_many()
        .col_expr(api_key::Column::LastUsedAt, Expr::value(now))
        .filter(api_key::Column::Id.eq(&key.id))
        .exec(&ctx.db)
        .await?;
    ctx.cache
        .revalidate_organisation(OrganisationCacheKey::ApiKeys, &key.organisation_id, &[])?;

    Ok(key.organisation_id)
}
