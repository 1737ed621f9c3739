use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set, TransactionTrait};
use tracing::info;
use validator::Validate;

use entity::sea_orm_active_enums::Role;
use entity::user;

use crate::actions::members::{admin_count, delete_user, member_count, LAST_ADMIN};
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::organisation::UpdatePreferencesInput;
use crate::session::Session;
use crate::util::now_ts;

async fn current_user(ctx: &AppContext, session: &Session) -> Result<user::Model> {
    user::Entity::find_by_id(session.user_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("User"))
}

pub async fn update_preferences(ctx: &AppContext, session: &Session, input: UpdatePreferencesInput) -> Result<()> {
    input.validate()?;

    let mut active = current_user(ctx, session).await?.into_active_model();
    active.locale = Set(input.locale);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_user(session, UserCacheKey::Preferences, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])
}

/// Delete the caller's own account. The last admin of an organisation with other
/// members has to hand over the role first.
pub async fn delete_account(ctx: &AppContext, session: &Session) -> Result<()> {
    let me = current_user(ctx, session).await?;
    if me.role == Role::Admin {
        let members = member_count(&ctx.db, &session.organisation_id).await?;
        let admins = admin_count(&ctx.db, &session.organisation_id).await?;
        if members > 1 && admins < 2 {
            return Err(Error::forbidden(LAST_ADMIN));
        }
    }

    let txn = ctx.db.begin().await?;
    delete_user(&txn, &me).await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])?;
    info!(user_id = %session.user_id, "account deleted");
    Ok(())
}
