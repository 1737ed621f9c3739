//! Authenticated mutations.
//!
//! Every action takes the caller's [`Session`](crate::session::Session), validates
//! its input, re-checks tenant ownership of the rows it touches, writes (usually in
//! one transaction), and revalidates the affected cache tags after commit.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use entity::sea_orm_active_enums::ActionType;
use entity::{contact, contact_activity};

use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

pub mod account;
pub mod api_keys;
pub mod auth;
pub mod contacts;
pub mod feedback;
pub mod invitations;
pub mod members;
pub mod onboarding;
pub mod organisation;
pub mod pinned;
pub mod webhooks;

/// Load a contact that belongs to `organisation_id`.
pub(crate) async fn find_contact<C: ConnectionTrait>(
    conn: &C,
    organisation_id: &str,
    contact_id: &str,
) -> Result<contact::Model> {
    contact::Entity::find_by_id(contact_id.to_string())
        .filter(contact::Column::OrganisationId.eq(organisation_id))
        .one(conn)
        .await?
        .ok_or(Error::NotFound("Contact"))
}

/// Append a timeline event for `contact_id`.
pub(crate) async fn capture_activity<C: ConnectionTrait>(
    conn: &C,
    contact_id: &str,
    action_type: ActionType,
    actor_id: &str,
    metadata: serde_json::Value,
) -> Result<()> {
    let metadata = match &metadata {
        serde_json::Value::Object(map) if map.is_empty() => None,
        serde_json::Value::Null => None,
        other => Some(serde_json::to_string(other)?),
    };
    contact_activity::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(contact_id.to_string()),
        action_type: Set(action_type),
        actor_id: Set(actor_id.to_string()),
        metadata: Set(metadata),
        occurred_at: Set(now_ts()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

impl AppContext {
    pub(crate) fn revalidate_organisation(
        &self,
        session: &Session,
        key: OrganisationCacheKey,
        extras: &[&str],
    ) -> Result<()> {
        self.cache
            .revalidate_organisation(key, &session.organisation_id, extras)?;
        Ok(())
    }

    pub(crate) fn revalidate_user(&self, session: &Session, key: UserCacheKey, extras: &[&str]) -> Result<()> {
        self.cache.revalidate_user(key, &session.user_id, extras)?;
        Ok(())
    }
}
