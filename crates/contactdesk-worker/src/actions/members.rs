use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::info;
use validator::Validate;

use entity::sea_orm_active_enums::Role;
use entity::{invitation, session as session_entity, user};

use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::members::ChangeRoleInput;
use crate::schemas::IdInput;
use crate::session::Session;
use crate::util::now_ts;

pub(crate) const LAST_ADMIN: &str = "At least one admin is required.";

pub(crate) async fn member_count<C: ConnectionTrait>(conn: &C, organisation_id: &str) -> Result<u64> {
    Ok(user::Entity::find()
        .filter(user::Column::OrganisationId.eq(organisation_id))
        .count(conn)
        .await?)
}

pub(crate) async fn admin_count<C: ConnectionTrait>(conn: &C, organisation_id: &str) -> Result<u64> {
    Ok(user::Entity::find()
        .filter(user::Column::OrganisationId.eq(organisation_id))
        .filter(user::Column::Role.eq(Role::Admin))
        .count(conn)
        .await?)
}

async fn find_member(ctx: &AppContext, session: &Session, id: &str) -> Result<user::Model> {
    user::Entity::find_by_id(id.to_string())
        .filter(user::Column::OrganisationId.eq(&session.organisation_id))
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Member"))
}

/// Remove a user together with their sessions and any invitations of this organisation
/// addressed to their email.
pub(crate) async fn delete_user<C: ConnectionTrait>(conn: &C, member: &user::Model) -> Result<()> {
    invitation::Entity::delete_many()
        .filter(invitation::Column::OrganisationId.eq(&member.organisation_id))
        .filter(invitation::Column::Email.eq(&member.email))
        .exec(conn)
        .await?;
    session_entity::Entity::delete_many()
        .filter(session_entity::Column::UserId.eq(&member.id))
        .exec(conn)
        .await?;
    user::Entity::delete_by_id(member.id.clone()).exec(conn).await?;
    Ok(())
}

pub async fn change_role(ctx: &AppContext, session: &Session, input: ChangeRoleInput) -> Result<()> {
    input.validate()?;
    session.require_admin()?;

    let member = find_member(ctx, session, &input.id).await?;
    if member.role == input.role {
        return Ok(());
    }
    if member.role == Role::Admin && admin_count(&ctx.db, &session.organisation_id).await? < 2 {
        return Err(Error::forbidden(LAST_ADMIN));
    }

    let member_id = member.id.clone();
    let mut active = member.into_active_model();
    active.role = Set(input.role);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])?;
    ctx.cache
        .revalidate_user(UserCacheKey::PersonalDetails, &member_id, &[])?;
    info!(member_id, role = ?input.role, "member role changed");
    Ok(())
}

pub async fn remove_member(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    if !session.is_admin() {
        return Err(Error::forbidden("Insufficient permissions"));
    }

    let member = find_member(ctx, session, &input.id).await?;
    if member.role == Role::Admin && admin_count(&ctx.db, &session.organisation_id).await? < 2 {
        return Err(Error::forbidden(LAST_ADMIN));
    }

    let txn = ctx.db.begin().await?;
    delete_user(&txn, &member).await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])?;
    info!(member_id = %member.id, "member removed");
    Ok(())
}
