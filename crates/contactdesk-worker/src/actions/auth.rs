//! Account creation and credential exchange. These are the only actions that run
//! without a session.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use entity::sea_orm_active_enums::{InvitationStatus, Role};
use entity::{invitation, organisation, pinned, user};

use crate::actions::organisation::create_default_business_hours;
use crate::actions::members::{admin_count, member_count, LAST_ADMIN};
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::crypto::{hash_password, verify_password, PasswordHash};
use crate::error::{Error, Result};
use crate::schemas::auth::{JoinInput, SignInInput, SignUpInput};
use crate::session::{create_session, Session};
use crate::util::{normalize_email, now_ts, uuid_v4};

const INITIAL_ORGANISATION_NAME: &str = "My Organisation";
const DEFAULT_LOCALE: &str = "en-US";

/// Returned by every action that ends with a signed-in user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    pub user_id: String,
    pub organisation_id: String,
    pub token: String,
}

async fn email_registered<C: ConnectionTrait>(conn: &C, email: &str) -> Result<bool> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .count(conn)
        .await?
        > 0)
}

async fn create_organisation<C: ConnectionTrait>(conn: &C) -> Result<organisation::Model> {
    let now = now_ts();
    let org = organisation::ActiveModel {
        id: Set(uuid_v4()?),
        name: Set(INITIAL_ORGANISATION_NAME.to_string()),
        address: Set(None),
        phone: Set(None),
        email: Set(None),
        website: Set(None),
        completed_onboarding: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    create_default_business_hours(conn, &org.id).await?;
    Ok(org)
}

struct NewUser<'a> {
    organisation_id: &'a str,
    name: String,
    email: String,
    password: &'a PasswordHash,
    role: Role,
    locale: String,
}

async fn insert_user<C: ConnectionTrait>(conn: &C, new: NewUser<'_>) -> Result<user::Model> {
    let now = now_ts();
    Ok(user::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(new.organisation_id.to_string()),
        name: Set(new.name),
        email: Set(new.email),
        password_hash: Set(Some(new.password.hash.clone())),
        password_salt: Set(Some(new.password.salt.clone())),
        password_iterations: Set(i32::try_from(new.password.iterations).unwrap_or(i32::MAX)),
        role: Set(new.role),
        locale: Set(new.locale),
        phone: Set(None),
        image: Set(None),
        completed_onboarding: Set(false),
        last_login: Set(Some(now)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

/// Sign-up: a fresh organisation with default business hours and its first admin.
pub async fn create_user_with_organisation(ctx: &AppContext, input: SignUpInput) -> Result<SignedIn> {
    input.validate()?;
    let email = normalize_email(&input.email);
    if email_registered(&ctx.db, &email).await? {
        return Err(Error::precondition("Email address is already registered"));
    }
    let password = hash_password(&input.password, ctx.config.password_iterations)?;

    let txn = ctx.db.begin().await?;
    let org = create_organisation(&txn).await?;
    let created = insert_user(
        &txn,
        NewUser {
            organisation_id: &org.id,
            name: input.name,
            email,
            password: &password,
            role: Role::Admin,
            locale: input.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        },
    )
    .await?;
    let token = create_session(&txn, &created.id, ctx.config.session_max_age_seconds).await?;
    txn.commit().await?;

    info!(user_id = %created.id, organisation_id = %org.id, "user signed up");
    Ok(SignedIn {
        user_id: created.id,
        organisation_id: org.id,
        token,
    })
}

/// Move the caller into a brand-new organisation as its admin. Returns the new organisation id.
/// The last admin of an organisation with other members has to hand over the role first.
pub async fn create_organisation_and_connect_user(ctx: &AppContext, session: &Session) -> Result<String> {
    let me = user::Entity::find_by_id(session.user_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("User"))?;
    if me.role == Role::Admin {
        let members = member_count(&ctx.db, &me.organisation_id).await?;
        let admins = admin_count(&ctx.db, &me.organisation_id).await?;
        if members > 1 && admins < 2 {
            return Err(Error::forbidden(LAST_ADMIN));
        }
    }

    let txn = ctx.db.begin().await?;
    let org = create_organisation(&txn).await?;
    // Pins point at contacts of the organisation being left.
    pinned::Entity::delete_many()
        .filter(pinned::Column::UserId.eq(&me.id))
        .exec(&txn)
        .await?;
    let mut active = me.into_active_model();
    active.organisation_id = Set(org.id.clone());
    active.role = Set(Role::Admin);
    active.updated_at = Set(now_ts());
    active.update(&txn).await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Members, &[])?;
    ctx.cache
        .revalidate_organisation(OrganisationCacheKey::Members, &org.id, &[])?;
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    ctx.revalidate_user(session, UserCacheKey::OnboardingData, &[])?;
    info!(user_id = %session.user_id, organisation_id = %org.id, "user moved to new organisation");
    Ok(org.id)
}

/// Accept an invitation: creates the invited user and signs them in.
pub async fn join(ctx: &AppContext, input: JoinInput) -> Result<SignedIn> {
    input.validate()?;

    let invitation = invitation::Entity::find_by_id(input.invitation_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Invitation"))?;
    match invitation.status {
        InvitationStatus::Revoked => return Err(Error::precondition("Invitation was revoked")),
        InvitationStatus::Accepted => return Err(Error::precondition("Invitation was already accepted")),
        InvitationStatus::Pending => {}
    }
    let org_exists = organisation::Entity::find_by_id(invitation.organisation_id.clone())
        .count(&ctx.db)
        .await?
        > 0;
    if !org_exists {
        return Err(Error::NotFound("Organisation"));
    }

    let email = normalize_email(&invitation.email);
    if email_registered(&ctx.db, &email).await? {
        return Err(Error::precondition("Email address is already registered"));
    }
    let password = hash_password(&input.password, ctx.config.password_iterations)?;

    let txn = ctx.db.begin().await?;
    let accepted = invitation::Entity::update_many()
        .col_expr(invitation::Column::Status, Expr::value(InvitationStatus::Accepted))
        .col_expr(invitation::Column::UpdatedAt, Expr::value(now_ts()))
        .filter(invitation::Column::Id.eq(&invitation.id))
        .filter(invitation::Column::Status.eq(InvitationStatus::Pending))
        .exec(&txn)
        .await?;
    if accepted.rows_affected == 0 {
        return Err(Error::precondition("Invitation is no longer pending"));
    }
    let created = insert_user(
        &txn,
        NewUser {
            organisation_id: &invitation.organisation_id,
            name: input.name,
            email,
            password: &password,
            role: invitation.role,
            locale: DEFAULT_LOCALE.to_string(),
        },
    )
    .await?;
    let token = create_session(&txn, &created.id, ctx.config.session_max_age_seconds).await?;
    txn.commit().await?;

    ctx.cache
        .revalidate_organisation(OrganisationCacheKey::Members, &invitation.organisation_id, &[])?;
    ctx.cache
        .revalidate_organisation(OrganisationCacheKey::Invitations, &invitation.organisation_id, &[])?;

    info!(user_id = %created.id, invitation_id = %invitation.id, "invitation accepted");
    Ok(SignedIn {
        user_id: created.id,
        organisation_id: invitation.organisation_id,
        token,
    })
}

/// Exchange email and password for a session token.
pub async fn sign_in(ctx: &AppContext, input: SignInInput) -> Result<SignedIn> {
    input.validate()?;
    let rejected = || Error::Unauthorized("Invalid email or password".to_string());

    let email = normalize_email(&input.email);
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&ctx.db)
        .await?
        .ok_or_else(rejected)?;
    let (Some(hash), Some(salt)) = (found.password_hash.clone(), found.password_salt.clone()) else {
        return Err(rejected());
    };
    let stored = PasswordHash {
        hash,
        salt,
        iterations: u32::try_from(found.password_iterations).unwrap_or(0),
    };
    if !verify_password(&input.password, &stored) {
        warn!(user_id = %found.id, "password mismatch");
        return Err(rejected());
    }

    let token = create_session(&ctx.db, &found.id, ctx.config.session_max_age_seconds).await?;
    user::Entity::update_many()
        .col_expr(user::Column::LastLogin, Expr::value(now_ts()))
        .filter(user::Column::Id.eq(&found.id))
        .exec(&ctx.db)
        .await?;

    Ok(SignedIn {
        user_id: found.id,
        organisation_id: found.organisation_id,
        token,
    })
}
