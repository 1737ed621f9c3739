use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use entity::{api_key, webhook};

use crate::actions::webhooks::decode_triggers;
use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::data::CacheSlot;
use crate::error::Result;
use crate::schemas::developers::WebhookTrigger;
use crate::session::Session;
use crate::util::ts_to_rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyDto {
    pub id: String,
    pub description: String,
    pub last_used_at: Option<String>,
    pub expires_at: Option<String>,
}

pub async fn get_api_keys(ctx: &AppContext, session: &Session) -> Result<Vec<ApiKeyDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::ApiKeys, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let keys = api_key::Entity::find()
                .filter(api_key::Column::OrganisationId.eq(&session.organisation_id))
                .order_by_asc(api_key::Column::CreatedAt)
                .all(&ctx.db)
                .await?;
            Ok(keys
                .into_iter()
                .map(|k| ApiKeyDto {
                    id: k.id,
                    description: k.description,
                    last_used_at: k.last_used_at.map(ts_to_rfc3339),
                    expires_at: k.expires_at.map(ts_to_rfc3339),
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDto {
    pub id: String,
    pub url: String,
    pub triggers: Vec<WebhookTrigger>,
    pub secret: Option<String>,
}

pub async fn get_webhooks(ctx: &AppContext, session: &Session) -> Result<Vec<WebhookDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::Webhooks, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let hooks = webhook::Entity::find()
                .filter(webhook::Column::OrganisationId.eq(&session.organisation_id))
                .order_by_asc(webhook::Column::CreatedAt)
                .all(&ctx.db)
                .await?;
            Ok(hooks
                .into_iter()
                .map(|w| WebhookDto {
                    triggers: decode_triggers(&w.triggers),
                    id: w.id,
                    url: w.url,
                    secret: w.secret,
                })
                .collect())
        })
        .await
}
