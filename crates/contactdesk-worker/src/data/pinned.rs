use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use entity::{contact, pinned};

use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::data::contacts::{to_dtos, ContactDto};
use crate::data::CacheSlot;
use crate::error::Result;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedDto {
    pub id: String,
    pub order: i32,
    pub contact: ContactDto,
}

/// The caller's pins in ascending `order`.
pub async fn get_pinned(ctx: &AppContext, session: &Session) -> Result<Vec<PinnedDto>> {
    let slot = CacheSlot::user(session, UserCacheKey::Pinned, &[])?
        .also_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let pins = pinned::Entity::find()
                .filter(pinned::Column::UserId.eq(&session.user_id))
                .order_by_asc(pinned::Column::Order)
                .all(&ctx.db)
                .await?;
            if pins.is_empty() {
                return Ok(Vec::new());
            }
            let contacts = contact::Entity::find()
                .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
                .filter(contact::Column::Id.is_in(pins.iter().map(|p| p.contact_id.clone())))
                .all(&ctx.db)
                .await?;
            let mut contacts = to_dtos(&ctx.db, contacts).await?;

            Ok(pins
                .into_iter()
                .filter_map(|p| {
                    let idx = contacts.iter().position(|c| c.id == p.contact_id)?;
                    Some(PinnedDto {
                        id: p.id,
                        order: p.order,
                        contact: contacts.swap_remove(idx),
                    })
                })
                .collect())
        })
        .await
}
