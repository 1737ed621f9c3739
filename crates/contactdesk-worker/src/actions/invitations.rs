//! Invitation lifecycle: `PENDING` moves to `ACCEPTED` or `REVOKED`, never back.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{error, info, warn};
use validator::Validate;

use entity::sea_orm_active_enums::{InvitationStatus, Role};
use entity::{invitation, organisation, user};

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::mail::{invitation_email, revoked_invitation_email};
use crate::schemas::members::SendInvitationInput;
use crate::schemas::IdInput;
use crate::session::Session;
use crate::util::{generate_token, normalize_email, now_ts, uuid_v4};

async fn organisation_name(ctx: &AppContext, organisation_id: &str) -> Result<String> {
    organisation::Entity::find_by_id(organisation_id.to_string())
        .one(&ctx.db)
        .await?
        .map(|o| o.name)
        .ok_or(Error::NotFound("Organisation"))
}

async fn find_invitation(ctx: &AppContext, session: &Session, id: &str) -> Result<invitation::Model> {
    invitation::Entity::find_by_id(id.to_string())
        .filter(invitation::Column::OrganisationId.eq(&session.organisation_id))
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Invitation"))
}

/// Deliver the invitation email and stamp `last_sent_at` once it went out.
async fn deliver(ctx: &AppContext, session: &Session, invitation: &invitation::Model, organisation_name: &str) -> Result<()> {
    let link = ctx.config.invitation_link(&invitation.token);
    ctx.mailer
        .send(invitation_email(&invitation.email, organisation_name, &session.name, &link))
        .await?;

    invitation::Entity::update_many()
        .col_expr(invitation::Column::LastSentAt, Expr::value(now_ts()))
        .filter(invitation::Column::Id.eq(&invitation.id))
        .exec(&ctx.db)
        .await?;
    Ok(())
}

pub async fn send_invitation(ctx: &AppContext, session: &Session, input: SendInvitationInput) -> Result<String> {
    input.validate()?;
    if input.role == Role::Admin && !session.is_admin() {
        return Err(Error::forbidden("Insufficient permissions"));
    }
    let email = normalize_email(&input.email);

    let taken_by_user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .count(&ctx.db)
        .await?
        > 0;
    let taken_by_invitation = invitation::Entity::find()
        .filter(invitation::Column::OrganisationId.eq(&session.organisation_id))
        .filter(invitation::Column::Email.eq(&email))
        .filter(invitation::Column::Status.ne(InvitationStatus::Revoked))
        .count(&ctx.db)
        .await?
        > 0;
    if taken_by_user || taken_by_invitation {
        return Err(Error::precondition("Email address is already taken"));
    }

    let organisation_name = organisation_name(ctx, &session.organisation_id).await?;

    let now = now_ts();
    let txn = ctx.db.begin().await?;
    invitation::Entity::update_many()
        .col_expr(invitation::Column::Status, Expr::value(InvitationStatus::Revoked))
        .col_expr(invitation::Column::UpdatedAt, Expr::value(now))
        .filter(invitation::Column::OrganisationId.eq(&session.organisation_id))
        .filter(invitation::Column::Email.eq(&email))
        .filter(invitation::Column::Status.eq(InvitationStatus::Pending))
        .exec(&txn)
        .await?;
    let created = invitation::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(session.organisation_id.clone()),
        token: Set(generate_token()?),
        email: Set(email),
        role: Set(input.role),
        status: Set(InvitationStatus::Pending),
        last_sent_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])?;

    match deliver(ctx, session, &created, &organisation_name).await {
        Ok(()) => {
            ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])?;
            info!(invitation_id = %created.id, "invitation sent");
        }
        Err(err) => error!(invitation_id = %created.id, error = %err, "failed to send invitation email"),
    }
    Ok(created.id)
}

pub async fn resend_invitation(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let invitation = find_invitation(ctx, session, &input.id).await?;
    match invitation.status {
        InvitationStatus::Accepted => return Err(Error::precondition("Invitation already accepted")),
        InvitationStatus::Revoked => return Err(Error::precondition("Invitation was revoked")),
        InvitationStatus::Pending => {}
    }

    let organisation_name = organisation_name(ctx, &session.organisation_id).await?;
    deliver(ctx, session, &invitation, &organisation_name).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])
}

/// Revoke a pending invitation. Anything else is left untouched and no email is sent.
pub async fn revoke_invitation(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let invitation = find_invitation(ctx, session, &input.id).await?;

    let result = invitation::Entity::update_many()
        .col_expr(invitation::Column::Status, Expr::value(InvitationStatus::Revoked))
        .col_expr(invitation::Column::UpdatedAt, Expr::value(now_ts()))
        .filter(invitation::Column::Id.eq(&invitation.id))
        .filter(invitation::Column::Status.eq(InvitationStatus::Pending))
        .exec(&ctx.db)
        .await?;
    if result.rows_affected == 0 {
        return Ok(());
    }

    ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])?;

    match organisation_name(ctx, &session.organisation_id).await {
        Ok(name) => {
            if let Err(err) = ctx
                .mailer
                .send(revoked_invitation_email(&invitation.email, &name))
                .await
            {
                warn!(invitation_id = %invitation.id, error = %err, "failed to send revoked invitation email");
            }
        }
        Err(err) => warn!(invitation_id = %invitation.id, error = %err, "skipping revoked invitation email"),
    }
    Ok(())
}

pub async fn delete_invitation(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let invitation = find_invitation(ctx, session, &input.id).await?;
    invitation.into_active_model().delete(&ctx.db).await?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Invitations, &[])
}
