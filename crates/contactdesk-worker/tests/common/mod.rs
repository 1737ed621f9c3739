#![allow(dead_code)]

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use contactdesk_worker::actions::auth::{create_user_with_organisation, join};
use contactdesk_worker::actions::contacts::add_contact;
use contactdesk_worker::actions::invitations::send_invitation;
use contactdesk_worker::caching::TagCache;
use contactdesk_worker::config::AppConfig;
use contactdesk_worker::mail::RecordingMailer;
use contactdesk_worker::media::InMemoryMediaStore;
use contactdesk_worker::session::{authenticate_token, Session};
use contactdesk_worker::AppContext;

pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub ctx: AppContext,
    pub mailer: Arc<RecordingMailer>,
    pub media: Arc<InMemoryMediaStore>,
}

/// Fresh in-memory database with every migration applied.
pub async fn setup() -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise get its own empty database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("open sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");

    let mailer = Arc::new(RecordingMailer::new());
    let media = Arc::new(InMemoryMediaStore::new());
    let config = AppConfig {
        base_url: "https://crm.test".to_string(),
        feedback_email: Some("feedback@crm.test".to_string()),
        password_iterations: 1_000,
        ..AppConfig::default()
    };
    let ctx = AppContext::new(
        db,
        Arc::new(TagCache::new(60)),
        mailer.clone(),
        media.clone(),
        config,
    );

    TestApp { ctx, mailer, media }
}

/// Deserialize an action input the way the HTTP layer does.
pub fn input<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("well-formed input")
}

/// Sign up a new admin with their own organisation.
pub async fn sign_up(app: &TestApp, name: &str, email: &str) -> Session {
    let signed_in = create_user_with_organisation(
        &app.ctx,
        input(json!({ "name": name, "email": email, "password": PASSWORD })),
    )
    .await
    .expect("sign up");
    authenticate_token(&app.ctx.db, &signed_in.token)
        .await
        .expect("fresh session token")
}

/// Invite `email` into the admin's organisation and accept the invitation.
pub async fn invite_member(app: &TestApp, admin: &Session, name: &str, email: &str, role: &str) -> Session {
    let invitation_id = send_invitation(&app.ctx, admin, input(json!({ "email": email, "role": role })))
        .await
        .expect("send invitation");
    let signed_in = join(
        &app.ctx,
        input(json!({ "invitationId": invitation_id, "name": name, "password": PASSWORD })),
    )
    .await
    .expect("join");
    authenticate_token(&app.ctx.db, &signed_in.token)
        .await
        .expect("fresh session token")
}

pub async fn add_person(app: &TestApp, session: &Session, first: &str, last: &str) -> String {
    add_contact(
        &app.ctx,
        session,
        input(json!({ "record": "PERSON", "firstName": first, "lastName": last })),
    )
    .await
    .expect("add person")
}

pub async fn add_company(app: &TestApp, session: &Session, name: &str) -> String {
    add_contact(
        &app.ctx,
        session,
        input(json!({ "record": "COMPANY", "companyName": name })),
    )
    .await
    .expect("add company")
}
