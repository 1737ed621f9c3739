use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};
use tracing::info;
use validator::Validate;

use entity::webhook;

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::developers::{CreateWebhookInput, UpdateWebhookInput, WebhookTrigger};
use crate::schemas::IdInput;
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

/// Dedupe while keeping the first occurrence of each trigger.
fn encode_triggers(triggers: &[WebhookTrigger]) -> Result<String> {
    let mut unique: Vec<WebhookTrigger> = Vec::with_capacity(triggers.len());
    for t in triggers {
        if !unique.contains(t) {
            unique.push(*t);
        }
    }
    Ok(serde_json::to_string(&unique)?)
}

pub(crate) fn decode_triggers(raw: &str) -> Vec<WebhookTrigger> {
    serde_json::from_str(raw).unwrap_or_default()
}

async fn find_webhook(ctx: &AppContext, session: &Session, id: &str) -> Result<webhook::Model> {
    webhook::Entity::find_by_id(id.to_string())
        .filter(webhook::Column::OrganisationId.eq(&session.organisation_id))
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Webhook"))
}

pub async fn create_webhook(ctx: &AppContext, session: &Session, input: CreateWebhookInput) -> Result<String> {
    input.validate()?;

    let now = now_ts();
    let created = webhook::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(session.organisation_id.clone()),
        url: Set(input.url),
        triggers: Set(encode_triggers(&input.triggers)?),
        secret: Set(input.secret),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Webhooks, &[])?;
    info!(webhook_id = %created.id, "webhook created");
    Ok(created.id)
}

pub async fn update_webhook(ctx: &AppContext, session: &Session, input: UpdateWebhookInput) -> Result<()> {
    input.validate()?;

    let mut active = find_webhook(ctx, session, &input.id).await?.into_active_model();
    active.url = Set(input.url);
    active.triggers = Set(encode_triggers(&input.triggers)?);
    active.secret = Set(input.secret);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Webhooks, &[])
}

pub async fn delete_webhook(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;

    let hook = find_webhook(ctx, session, &input.id).await?;
    webhook::Entity::delete_by_id(hook.id).exec(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Webhooks, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_are_deduplicated_in_order() {
        let raw = encode_triggers(&[
            WebhookTrigger::ContactDeleted,
            WebhookTrigger::ContactCreated,
            WebhookTrigger::ContactDeleted,
        ])
        .unwrap();
        assert_eq!(raw, r#"["CONTACT_DELETED","CONTACT_CREATED"]"#);
        assert_eq!(
            decode_triggers(&raw),
            vec![WebhookTrigger::ContactDeleted, WebhookTrigger::ContactCreated]
        );
    }

    #[test]
    fn unreadable_triggers_decode_to_empty() {
        assert!(decode_triggers("not json").is_empty());
    }
}
