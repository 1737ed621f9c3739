mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use contactdesk_worker::actions::api_keys::{create_api_key, revoke_api_key, verify_api_key};
use contactdesk_worker::actions::auth::create_organisation_and_connect_user;
use contactdesk_worker::actions::feedback::send_feedback;
use contactdesk_worker::actions::onboarding::complete_onboarding;
use contactdesk_worker::actions::organisation::{update_business_hours, update_organisation_details};
use contactdesk_worker::actions::pinned::add_pinned;
use contactdesk_worker::actions::webhooks::{create_webhook, delete_webhook, update_webhook};
use contactdesk_worker::data::developers::{get_api_keys, get_webhooks};
use contactdesk_worker::data::members::get_members;
use contactdesk_worker::data::organisation::{get_business_hours, get_onboarding_data, get_organisation_details};
use contactdesk_worker::data::pinned::get_pinned;
use contactdesk_worker::schemas::developers::WebhookTrigger;
use contactdesk_worker::schemas::{ContactIdInput, IdInput};
use contactdesk_worker::session::{authenticate_token, create_session};
use contactdesk_worker::util::now_ts;
use contactdesk_worker::Error;
use entity::sea_orm_active_enums::{DayOfWeek, Role};

use common::{add_person, input, invite_member, setup, sign_up};

#[tokio::test]
async fn new_organisations_open_weekdays_nine_to_five() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let hours = get_business_hours(&app.ctx, &admin).await.unwrap();
    let days: Vec<DayOfWeek> = hours.iter().map(|h| h.day_of_week).collect();
    assert_eq!(
        days,
        vec![
            DayOfWeek::Sunday,
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Wednesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
            DayOfWeek::Saturday,
        ]
    );
    assert!(hours[0].time_slots.is_empty() && hours[6].time_slots.is_empty());
    for weekday in &hours[1..6] {
        let slots: Vec<(&str, &str)> = weekday
            .time_slots
            .iter()
            .map(|s| (s.start.as_str(), s.end.as_str()))
            .collect();
        assert_eq!(slots, vec![("09:00", "17:00")]);
    }
}

#[tokio::test]
async fn business_hours_are_replaced_wholesale() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    get_business_hours(&app.ctx, &admin).await.unwrap();

    update_business_hours(
        &app.ctx,
        &admin,
        input(json!({ "businessHours": [
            { "dayOfWeek": "MONDAY", "timeSlots": [
                { "start": "13:30", "end": "18:00" },
                { "start": "08:00", "end": "12:00" },
            ] },
            { "dayOfWeek": "SATURDAY", "timeSlots": [{ "start": "10:00", "end": "14:00" }] },
        ] })),
    )
    .await
    .unwrap();

    let hours = get_business_hours(&app.ctx, &admin).await.unwrap();
    let slots_of = |day: DayOfWeek| -> Vec<(String, String)> {
        hours
            .iter()
            .find(|h| h.day_of_week == day)
            .unwrap()
            .time_slots
            .iter()
            .map(|s| (s.start.clone(), s.end.clone()))
            .collect()
    };
    assert_eq!(
        slots_of(DayOfWeek::Monday),
        vec![
            ("08:00".to_string(), "12:00".to_string()),
            ("13:30".to_string(), "18:00".to_string()),
        ]
    );
    assert_eq!(slots_of(DayOfWeek::Saturday), vec![("10:00".to_string(), "14:00".to_string())]);
    assert!(slots_of(DayOfWeek::Tuesday).is_empty());
}

#[tokio::test]
async fn malformed_time_slots_are_rejected() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let err = update_business_hours(
        &app.ctx,
        &admin,
        input(json!({ "businessHours": [
            { "dayOfWeek": "MONDAY", "timeSlots": [{ "start": "25:00", "end": "26:00" }] },
        ] })),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), 400);

    // The previous schedule survives.
    let hours = get_business_hours(&app.ctx, &admin).await.unwrap();
    assert_eq!(hours[1].time_slots.len(), 1);
}

#[tokio::test]
async fn organisation_details_round_trip() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let before = get_organisation_details(&app.ctx, &admin).await.unwrap();
    assert_eq!(before.name, "My Organisation");

    update_organisation_details(
        &app.ctx,
        &admin,
        input(json!({
            "name": "Analytical Engines",
            "address": "12 St James's Square",
            "phone": "",
            "email": "hello@engines.example",
            "website": "https://engines.example",
        })),
    )
    .await
    .unwrap();

    let after = get_organisation_details(&app.ctx, &admin).await.unwrap();
    assert_eq!(after.name, "Analytical Engines");
    assert_eq!(after.phone, None);
    assert_eq!(after.website.as_deref(), Some("https://engines.example"));
}

#[tokio::test]
async fn api_keys_resolve_to_their_organisation_until_revoked() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let created = create_api_key(&app.ctx, &admin, input(json!({ "description": "Zapier", "neverExpires": true })))
        .await
        .unwrap();
    let keys = get_api_keys(&app.ctx, &admin).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].expires_at, None);
    assert_eq!(keys[0].last_used_at, None);

    let organisation_id = verify_api_key(&app.ctx, &created.api_key).await.unwrap();
    assert_eq!(organisation_id, admin.organisation_id);
    assert!(get_api_keys(&app.ctx, &admin).await.unwrap()[0].last_used_at.is_some());

    let err = verify_api_key(&app.ctx, "not-a-key").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    revoke_api_key(&app.ctx, &admin, IdInput::new(&created.id)).await.unwrap();
    assert!(get_api_keys(&app.ctx, &admin).await.unwrap().is_empty());
    let err = verify_api_key(&app.ctx, &created.api_key).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    let err = revoke_api_key(&app.ctx, &admin, IdInput::new(&created.id)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("API key")));
}

#[tokio::test]
async fn expired_api_keys_are_refused() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let yesterday = now_ts() - 86_400;

    let created = create_api_key(
        &app.ctx,
        &admin,
        input(json!({ "description": "Old", "expiresAt": yesterday })),
    )
    .await
    .unwrap();

    let err = verify_api_key(&app.ctx, &created.api_key).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(ref msg) if msg == "API key expired"));
}

#[tokio::test]
async fn webhooks_crud() {
    let app = setup().await;
    let ada = sign_up(&app, "Ada", "ada@example.com").await;
    let bob = sign_up(&app, "Bob", "bob@example.com").await;

    let id = create_webhook(
        &app.ctx,
        &ada,
        input(json!({
            "url": "https://hooks.example.com/in",
            "triggers": ["CONTACT_CREATED", "CONTACT_CREATED", "CONTACT_DELETED"],
        })),
    )
    .await
    .unwrap();
    let hooks = get_webhooks(&app.ctx, &ada).await.unwrap();
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks[0].triggers, vec![WebhookTrigger::ContactCreated, WebhookTrigger::ContactDeleted]);
    assert!(get_webhooks(&app.ctx, &bob).await.unwrap().is_empty());

    update_webhook(
        &app.ctx,
        &ada,
        input(json!({ "id": id, "url": "https://hooks.example.com/v2", "triggers": ["CONTACT_UPDATED"], "secret": "s3cret" })),
    )
    .await
    .unwrap();
    let hooks = get_webhooks(&app.ctx, &ada).await.unwrap();
    assert_eq!(hooks[0].url, "https://hooks.example.com/v2");
    assert_eq!(hooks[0].secret.as_deref(), Some("s3cret"));

    let err = delete_webhook(&app.ctx, &bob, IdInput::new(&id)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("Webhook")));
    delete_webhook(&app.ctx, &ada, IdInput::new(&id)).await.unwrap();
    assert!(get_webhooks(&app.ctx, &ada).await.unwrap().is_empty());
}

#[tokio::test]
async fn feedback_is_forwarded_and_delivery_failures_are_swallowed() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    send_feedback(&app.ctx, &admin, input(json!({ "category": "SUGGESTION", "message": "Dark mode <please>" })))
        .await
        .unwrap();
    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "feedback@crm.test");
    assert_eq!(sent[0].subject, "Feedback (SUGGESTION) from My Organisation");
    assert!(sent[0].html.contains("Dark mode &lt;please&gt;"));

    app.mailer.set_failing(true);
    send_feedback(&app.ctx, &admin, input(json!({ "category": "PROBLEM", "message": "Broken" })))
        .await
        .unwrap();
}

#[tokio::test]
async fn the_last_admin_cannot_leave_for_a_new_organisation() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;

    let err = create_organisation_and_connect_user(&app.ctx, &admin).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(ref msg) if msg == "At least one admin is required."));

    let members = get_members(&app.ctx, &admin).await.unwrap();
    assert_eq!(members.len(), 2);
    let admins = members.iter().filter(|m| m.role == Role::Admin).count();
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn leaving_for_a_new_organisation_drops_pins_and_onboarding_state() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    complete_onboarding(
        &app.ctx,
        &admin,
        input(json!({ "organisationName": "Analytical Engines", "name": "Ada" })),
    )
    .await
    .unwrap();
    let member = invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;
    let grace = add_person(&app, &admin, "Grace", "Hopper").await;
    add_pinned(&app.ctx, &member, ContactIdInput::new(&grace)).await.unwrap();

    assert_eq!(get_pinned(&app.ctx, &member).await.unwrap().len(), 1);
    let before = get_onboarding_data(&app.ctx, &member).await.unwrap();
    assert_eq!(before.organisation.name, "Analytical Engines");

    create_organisation_and_connect_user(&app.ctx, &member).await.unwrap();
    let token = create_session(&app.ctx.db, &member.user_id, 3_600).await.unwrap();
    let moved = authenticate_token(&app.ctx.db, &token).await.unwrap();

    assert!(get_pinned(&app.ctx, &moved).await.unwrap().is_empty());
    let after = get_onboarding_data(&app.ctx, &moved).await.unwrap();
    assert_eq!(after.organisation.name, "My Organisation");
    assert!(!after.organisation.completed_onboarding);
}
