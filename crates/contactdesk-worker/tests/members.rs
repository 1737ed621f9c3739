mod common;

use pretty_assertions::assert_eq;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use contactdesk_worker::actions::account::{delete_account, update_preferences};
use contactdesk_worker::actions::auth::{create_organisation_and_connect_user, sign_in};
use contactdesk_worker::actions::members::{change_role, remove_member};
use contactdesk_worker::data::members::get_members;
use contactdesk_worker::schemas::IdInput;
use contactdesk_worker::session::authenticate_token;
use contactdesk_worker::Error;
use entity::sea_orm_active_enums::Role;

use common::{input, invite_member, setup, sign_up, PASSWORD};

#[tokio::test]
async fn admins_promote_and_demote() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let member = invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;

    let err = change_role(&app.ctx, &member, input(json!({ "id": admin.user_id, "role": "MEMBER" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    change_role(&app.ctx, &admin, input(json!({ "id": member.user_id, "role": "ADMIN" })))
        .await
        .unwrap();
    let members = get_members(&app.ctx, &admin).await.unwrap();
    assert!(members.iter().all(|m| m.role == Role::Admin));

    // With two admins either may step down.
    change_role(&app.ctx, &admin, input(json!({ "id": admin.user_id, "role": "MEMBER" })))
        .await
        .unwrap();
    let members = get_members(&app.ctx, &admin).await.unwrap();
    let ada = members.iter().find(|m| m.name == "Ada").unwrap();
    assert_eq!(ada.role, Role::Member);
}

#[tokio::test]
async fn the_last_admin_cannot_be_demoted_or_removed() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;

    let err = change_role(&app.ctx, &admin, input(json!({ "id": admin.user_id, "role": "MEMBER" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref msg) if msg == "At least one admin is required."));

    let err = remove_member(&app.ctx, &admin, IdInput::new(&admin.user_id)).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref msg) if msg == "At least one admin is required."));

    let err = delete_account(&app.ctx, &admin).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn removing_a_member_ends_their_sessions() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let member = invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;
    let signed_in = sign_in(&app.ctx, input(json!({ "email": "max@example.com", "password": PASSWORD })))
        .await
        .unwrap();

    let err = remove_member(&app.ctx, &member, IdInput::new(&admin.user_id)).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref msg) if msg == "Insufficient permissions"));

    remove_member(&app.ctx, &admin, IdInput::new(&member.user_id)).await.unwrap();

    let members = get_members(&app.ctx, &admin).await.unwrap();
    assert_eq!(members.len(), 1);
    let err = authenticate_token(&app.ctx.db, &signed_in.token).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    // The address is free to be invited again.
    invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;
}

#[tokio::test]
async fn members_of_other_organisations_are_not_found() {
    let app = setup().await;
    let ada = sign_up(&app, "Ada", "ada@example.com").await;
    let bob = sign_up(&app, "Bob", "bob@example.com").await;

    let err = change_role(&app.ctx, &ada, input(json!({ "id": bob.user_id, "role": "MEMBER" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound("Member")));
    let err = remove_member(&app.ctx, &ada, IdInput::new(&bob.user_id)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("Member")));
}

#[tokio::test]
async fn sign_in_checks_the_password() {
    let app = setup().await;
    sign_up(&app, "Ada", "ada@example.com").await;

    let err = sign_in(&app.ctx, input(json!({ "email": "ada@example.com", "password": "wrong password" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert_eq!(err.status(), 401);

    let signed_in = sign_in(&app.ctx, input(json!({ "email": " ADA@example.com", "password": PASSWORD })))
        .await
        .unwrap();
    let session = authenticate_token(&app.ctx.db, &signed_in.token).await.unwrap();
    assert_eq!(session.name, "Ada");
    assert!(session.is_admin());
}

#[tokio::test]
async fn raising_password_rounds_keeps_existing_accounts() {
    let mut app = setup().await;
    sign_up(&app, "Ada", "ada@example.com").await;

    app.ctx.config.password_iterations = 2_000;
    sign_in(&app.ctx, input(json!({ "email": "ada@example.com", "password": PASSWORD })))
        .await
        .unwrap();

    // New accounts pick up the raised count.
    sign_up(&app, "Bob", "bob@example.com").await;
    let stored = entity::user::Entity::find()
        .filter(entity::user::Column::Email.eq("bob@example.com"))
        .one(&app.ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.password_iterations, 2_000);
}

#[tokio::test]
async fn preferences_update_the_member_list() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    get_members(&app.ctx, &admin).await.unwrap();

    update_preferences(&app.ctx, &admin, input(json!({ "locale": "de" }))).await.unwrap();

    let members = get_members(&app.ctx, &admin).await.unwrap();
    assert_eq!(members[0].locale, "de");
}

#[tokio::test]
async fn a_member_can_leave_for_a_new_organisation() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let member = invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;

    let organisation_id = create_organisation_and_connect_user(&app.ctx, &member).await.unwrap();
    assert_ne!(organisation_id, admin.organisation_id);

    assert_eq!(get_members(&app.ctx, &admin).await.unwrap().len(), 1);
    let signed_in = sign_in(&app.ctx, input(json!({ "email": "max@example.com", "password": PASSWORD })))
        .await
        .unwrap();
    let moved = authenticate_token(&app.ctx.db, &signed_in.token).await.unwrap();
    assert_eq!(moved.organisation_id, organisation_id);
    assert!(moved.is_admin());
}

#[tokio::test]
async fn sole_admin_may_delete_their_account() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    delete_account(&app.ctx, &admin).await.unwrap();

    let err = sign_in(&app.ctx, input(json!({ "email": "ada@example.com", "password": PASSWORD })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}
