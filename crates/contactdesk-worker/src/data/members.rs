use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use entity::sea_orm_active_enums::{InvitationStatus, Role};
use entity::{invitation, organisation, user};

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::data::CacheSlot;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::util::ts_to_rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: String,
    pub image: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub locale: String,
    pub date_added: String,
    pub last_login: Option<String>,
}

pub async fn get_members(ctx: &AppContext, session: &Session) -> Result<Vec<MemberDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::Members, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let members = user::Entity::find()
                .filter(user::Column::OrganisationId.eq(&session.organisation_id))
                .order_by_asc(user::Column::CreatedAt)
                .order_by_asc(user::Column::Id)
                .all(&ctx.db)
                .await?;
            Ok(members
                .into_iter()
                .map(|u| MemberDto {
                    id: u.id,
                    image: u.image,
                    name: u.name,
                    email: u.email,
                    role: u.role,
                    locale: u.locale,
                    date_added: ts_to_rfc3339(u.created_at),
                    last_login: u.last_login.map(ts_to_rfc3339),
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDto {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
    pub last_sent: Option<String>,
    pub date_added: String,
}

/// Invitations of the organisation that have not been accepted yet.
pub async fn get_invitations(ctx: &AppContext, session: &Session) -> Result<Vec<InvitationDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::Invitations, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let invitations = invitation::Entity::find()
                .filter(invitation::Column::OrganisationId.eq(&session.organisation_id))
                .filter(invitation::Column::Status.ne(InvitationStatus::Accepted))
                .order_by_desc(invitation::Column::CreatedAt)
                .all(&ctx.db)
                .await?;
            Ok(invitations
                .into_iter()
                .map(|i| InvitationDto {
                    id: i.id,
                    email: i.email,
                    role: i.role,
                    status: i.status,
                    last_sent: i.last_sent_at.map(ts_to_rfc3339),
                    date_added: ts_to_rfc3339(i.created_at),
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationLinkDto {
    pub id: String,
    pub organisation_name: String,
    pub email: String,
    pub role: Role,
    pub status: InvitationStatus,
}

/// Public lookup behind an invitation link. Not cached: it has no session to key on.
pub async fn get_invitation_by_token(ctx: &AppContext, token: &str) -> Result<InvitationLinkDto> {
    let found = invitation::Entity::find()
        .filter(invitation::Column::Token.eq(token.trim()))
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Invitation"))?;
    let org = organisation::Entity::find_by_id(found.organisation_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Organisation"))?;
    Ok(InvitationLinkDto {
        id: found.id,
        organisation_name: org.name,
        email: found.email,
        role: found.role,
        status: found.status,
    })
}
