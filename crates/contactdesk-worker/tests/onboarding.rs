mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use contactdesk_worker::actions::auth::create_organisation_and_connect_user;
use contactdesk_worker::actions::contacts::add_contact_page_visit;
use contactdesk_worker::actions::onboarding::{
    complete_onboarding, complete_organisation_only_onboarding, OnboardingOutcome,
};
use contactdesk_worker::data::contacts::{get_contact_tags, get_contacts};
use contactdesk_worker::data::home::get_most_visited_contacts;
use contactdesk_worker::data::organisation::get_onboarding_data;
use contactdesk_worker::schemas::data::{DateRangeInput, GetContactsInput};
use contactdesk_worker::schemas::ContactIdInput;
use contactdesk_worker::session::authenticate_token;
use contactdesk_worker::util::now_ts;

use common::{add_person, input, setup, sign_up};

fn today() -> DateRangeInput {
    let now = now_ts();
    DateRangeInput { from: now, to: now }
}

#[tokio::test]
async fn onboarding_completes_once_and_seeds_examples() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let before = get_onboarding_data(&app.ctx, &admin).await.unwrap();
    assert!(!before.organisation.completed_onboarding);
    assert!(!before.user.completed_onboarding);

    let outcome = complete_onboarding(
        &app.ctx,
        &admin,
        input(json!({ "organisationName": "Analytical Engines", "name": "Ada Lovelace", "phone": "" })),
    )
    .await
    .unwrap();
    assert_eq!(outcome, OnboardingOutcome::Completed);

    let after = get_onboarding_data(&app.ctx, &admin).await.unwrap();
    assert_eq!(after.organisation.name, "Analytical Engines");
    assert_eq!(after.user.name, "Ada Lovelace");
    assert!(after.organisation.completed_onboarding && after.user.completed_onboarding);

    let mut names: Vec<String> = get_contacts(&app.ctx, &admin, GetContactsInput::default())
        .await
        .unwrap()
        .contacts
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Alan Turing", "Grace Hopper", "Northwind Traders"]);
    assert!(!get_contact_tags(&app.ctx, &admin).await.unwrap().is_empty());

    let again = complete_onboarding(
        &app.ctx,
        &admin,
        input(json!({ "organisationName": "Other", "name": "Ada" })),
    )
    .await
    .unwrap();
    assert_eq!(again, OnboardingOutcome::AlreadyCompleted);
    let page = get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    assert_eq!(page.total_count, 3);
}

#[tokio::test]
async fn seeded_contacts_show_up_as_visited() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    complete_onboarding(
        &app.ctx,
        &admin,
        input(json!({ "organisationName": "Analytical Engines", "name": "Ada" })),
    )
    .await
    .unwrap();

    let visited = get_most_visited_contacts(&app.ctx, &admin, today()).await.unwrap();
    assert_eq!(visited.len(), 3);
    assert!(visited.iter().all(|v| v.page_visits == 1));

    let grace = visited.iter().find(|v| v.name == "Grace Hopper").unwrap().id.clone();
    add_contact_page_visit(&app.ctx, &admin, ContactIdInput::new(&grace)).await.unwrap();

    let visited = get_most_visited_contacts(&app.ctx, &admin, today()).await.unwrap();
    assert_eq!(visited[0].name, "Grace Hopper");
    assert_eq!(visited[0].page_visits, 2);
}

#[tokio::test]
async fn most_visited_is_capped_at_six() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    for i in 0..8 {
        let id = add_person(&app, &admin, "Person", &format!("Number {i}")).await;
        add_contact_page_visit(&app.ctx, &admin, ContactIdInput::new(&id)).await.unwrap();
    }

    let visited = get_most_visited_contacts(&app.ctx, &admin, today()).await.unwrap();
    assert_eq!(visited.len(), 6);
}

#[tokio::test]
async fn organisation_only_onboarding_for_a_new_organisation() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    complete_onboarding(
        &app.ctx,
        &admin,
        input(json!({ "organisationName": "Analytical Engines", "name": "Ada" })),
    )
    .await
    .unwrap();

    create_organisation_and_connect_user(&app.ctx, &admin).await.unwrap();
    let token = contactdesk_worker::session::create_session(&app.ctx.db, &admin.user_id, 3_600)
        .await
        .unwrap();
    let moved = authenticate_token(&app.ctx.db, &token).await.unwrap();

    let data = get_onboarding_data(&app.ctx, &moved).await.unwrap();
    assert!(!data.organisation.completed_onboarding);
    assert!(data.user.completed_onboarding);

    let outcome = complete_organisation_only_onboarding(
        &app.ctx,
        &moved,
        input(json!({ "organisationName": "Difference Engines" })),
    )
    .await
    .unwrap();
    assert_eq!(outcome, OnboardingOutcome::Completed);
    let data = get_onboarding_data(&app.ctx, &moved).await.unwrap();
    assert_eq!(data.organisation.name, "Difference Engines");
    assert!(data.organisation.completed_onboarding);

    let outcome = complete_organisation_only_onboarding(
        &app.ctx,
        &moved,
        input(json!({ "organisationName": "Again" })),
    )
    .await
    .unwrap();
    assert_eq!(outcome, OnboardingOutcome::AlreadyCompleted);
}
