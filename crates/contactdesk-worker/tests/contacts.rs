mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use contactdesk_worker::actions::contacts::{
    add_contact, add_contact_comment, add_contact_note, add_contact_task, archive_contacts,
    delete_contact_comment, delete_contact_note, delete_contacts, update_contact_comment,
    update_contact_note, update_contact_properties, update_contact_tags, update_contact_task,
};
use contactdesk_worker::data::contacts::{
    get_contact, get_contact_notes, get_contact_tags, get_contact_tasks, get_contact_timeline,
    get_contacts, TimelineEventDto,
};
use contactdesk_worker::schemas::data::GetContactsInput;
use contactdesk_worker::schemas::{ContactIdInput, IdInput};
use contactdesk_worker::Error;
use entity::sea_orm_active_enums::{ActionType, ContactStage, ContactTaskStatus};

use common::{add_company, add_person, input, invite_member, setup, sign_up};

#[tokio::test]
async fn add_contact_defaults_and_tags() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let id = add_contact(
        &app.ctx,
        &admin,
        input(json!({
            "firstName": " Grace ",
            "lastName": "Hopper",
            "email": "grace@example.com",
            "tags": ["navy", "compilers"],
        })),
    )
    .await
    .unwrap();

    let contact = get_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap();
    assert_eq!(contact.name, "Grace Hopper");
    assert_eq!(contact.stage, ContactStage::Lead);
    assert!(!contact.archived);
    let tags: Vec<&str> = contact.tags.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(tags, vec!["compilers", "navy"]);

    let org_tags = get_contact_tags(&app.ctx, &admin).await.unwrap();
    assert_eq!(org_tags.len(), 2);
}

#[tokio::test]
async fn person_without_last_name_is_rejected() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let err = add_contact(&app.ctx, &admin, input(json!({ "record": "PERSON", "firstName": "Grace" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(err.status(), 400);

    let err = add_contact(&app.ctx, &admin, input(json!({ "record": "COMPANY", "email": "x@example.com" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn invalid_email_fails_validation() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;

    let err = add_contact(
        &app.ctx,
        &admin,
        input(json!({ "firstName": "Grace", "lastName": "Hopper", "email": "not-an-email" })),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn contacts_are_scoped_to_their_organisation() {
    let app = setup().await;
    let ada = sign_up(&app, "Ada", "ada@example.com").await;
    let bob = sign_up(&app, "Bob", "bob@example.com").await;
    let id = add_person(&app, &ada, "Grace", "Hopper").await;

    let err = get_contact(&app.ctx, &bob, IdInput::new(&id)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("Contact")));

    let err = archive_contacts(&app.ctx, &bob, input(json!({ "ids": [id], "action": "archive" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // Foreign ids are ignored by bulk delete.
    delete_contacts(&app.ctx, &bob, input(json!({ "ids": [id] }))).await.unwrap();
    assert!(get_contact(&app.ctx, &ada, IdInput::new(&id)).await.is_ok());
}

#[tokio::test]
async fn list_filters_search_and_paging() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    add_person(&app, &admin, "Grace", "Hopper").await;
    add_person(&app, &admin, "Alan", "Turing").await;
    add_company(&app, &admin, "Northwind Traders").await;
    let archived = add_person(&app, &admin, "Charles", "Babbage").await;
    archive_contacts(&app.ctx, &admin, input(json!({ "ids": [archived], "action": "archive" })))
        .await
        .unwrap();

    let all = get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    assert_eq!(all.total_count, 3);
    assert_eq!(all.filtered_count, 3);

    let people = get_contacts(&app.ctx, &admin, input(json!({ "records": "people" })))
        .await
        .unwrap();
    assert_eq!(people.filtered_count, 2);
    assert_eq!(people.total_count, 3);

    let search = get_contacts(&app.ctx, &admin, input(json!({ "searchQuery": "Turi" })))
        .await
        .unwrap();
    assert_eq!(search.filtered_count, 1);
    assert_eq!(search.contacts[0].name, "Alan Turing");

    let archived_page = get_contacts(&app.ctx, &admin, input(json!({ "archived": true })))
        .await
        .unwrap();
    assert_eq!(archived_page.total_count, 1);

    let page = get_contacts(&app.ctx, &admin, input(json!({ "pageIndex": 1, "pageSize": 2 })))
        .await
        .unwrap();
    assert_eq!(page.contacts.len(), 1);
    assert_eq!(page.filtered_count, 3);
}

#[tokio::test]
async fn tag_filter_and_tag_replacement() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let grace = add_person(&app, &admin, "Grace", "Hopper").await;
    add_person(&app, &admin, "Alan", "Turing").await;

    update_contact_tags(
        &app.ctx,
        &admin,
        input(json!({ "id": grace, "tags": [{ "text": "vip" }, { "text": "navy" }] })),
    )
    .await
    .unwrap();
    let vip = get_contacts(&app.ctx, &admin, input(json!({ "tags": ["vip"] })))
        .await
        .unwrap();
    assert_eq!(vip.filtered_count, 1);

    update_contact_tags(&app.ctx, &admin, input(json!({ "id": grace, "tags": [{ "text": "navy" }] })))
        .await
        .unwrap();
    let contact = get_contact(&app.ctx, &admin, IdInput::new(&grace)).await.unwrap();
    let tags: Vec<&str> = contact.tags.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(tags, vec!["navy"]);
}

#[tokio::test]
async fn updates_are_captured_as_activities() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let id = add_person(&app, &admin, "Grace", "Hopper").await;

    update_contact_properties(
        &app.ctx,
        &admin,
        input(json!({
            "id": id,
            "record": "PERSON",
            "firstName": "Grace",
            "lastName": "Hopper",
            "phone1": "555-0100",
        })),
    )
    .await
    .unwrap();

    let timeline = get_contact_timeline(&app.ctx, &admin, ContactIdInput::new(&id))
        .await
        .unwrap();
    let updates: Vec<_> = timeline
        .iter()
        .filter_map(|event| match event {
            TimelineEventDto::Activity {
                action_type: ActionType::Update,
                metadata,
                ..
            } => metadata.clone(),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["phone1"], json!("555-0100"));
    assert!(updates[0].get("firstName").is_none() && updates[0].get("first_name").is_none());

    let creates = timeline
        .iter()
        .filter(|event| matches!(event, TimelineEventDto::Activity { action_type: ActionType::Create, .. }))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn tasks_lifecycle() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;

    let task = add_contact_task(&app.ctx, &admin, input(json!({ "contactId": contact, "title": "Call back" })))
        .await
        .unwrap();
    let tasks = get_contact_tasks(&app.ctx, &admin, ContactIdInput::new(&contact)).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, ContactTaskStatus::Open);

    update_contact_task(
        &app.ctx,
        &admin,
        input(json!({ "id": task, "title": "Call back", "status": "COMPLETED" })),
    )
    .await
    .unwrap();
    let tasks = get_contact_tasks(&app.ctx, &admin, ContactIdInput::new(&contact)).await.unwrap();
    assert_eq!(tasks[0].status, ContactTaskStatus::Completed);

    let bob = sign_up(&app, "Bob", "bob@example.com").await;
    let err = update_contact_task(
        &app.ctx,
        &bob,
        input(json!({ "id": task, "title": "Hijack", "status": "OPEN" })),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound("Contact task")));
}

#[tokio::test]
async fn notes_lifecycle() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;

    let note = add_contact_note(&app.ctx, &admin, input(json!({ "contactId": contact, "text": "Met at expo" })))
        .await
        .unwrap();
    update_contact_note(&app.ctx, &admin, input(json!({ "id": note, "text": "Met at the expo" })))
        .await
        .unwrap();
    let notes = get_contact_notes(&app.ctx, &admin, ContactIdInput::new(&contact)).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].text.as_deref(), Some("Met at the expo"));
    assert_eq!(notes[0].sender.as_ref().map(|s| s.name.as_str()), Some("Ada"));

    delete_contact_note(&app.ctx, &admin, IdInput::new(&note)).await.unwrap();
    assert!(get_contact_notes(&app.ctx, &admin, ContactIdInput::new(&contact))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn comments_respect_authorship() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let member = invite_member(&app, &admin, "Max", "max@example.com", "MEMBER").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;

    let by_admin = add_contact_comment(&app.ctx, &admin, input(json!({ "contactId": contact, "text": "First!" })))
        .await
        .unwrap();
    let by_member = add_contact_comment(&app.ctx, &member, input(json!({ "contactId": contact, "text": "Hi" })))
        .await
        .unwrap();

    let err = update_contact_comment(&app.ctx, &member, input(json!({ "id": by_admin, "text": "Edited" })))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    let err = delete_contact_comment(&app.ctx, &member, IdInput::new(&by_admin)).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    update_contact_comment(&app.ctx, &member, input(json!({ "id": by_member, "text": "Hello" })))
        .await
        .unwrap();
    // Admins may remove anyone's comment.
    delete_contact_comment(&app.ctx, &admin, IdInput::new(&by_member)).await.unwrap();

    let comments: Vec<String> = get_contact_timeline(&app.ctx, &admin, ContactIdInput::new(&contact))
        .await
        .unwrap()
        .into_iter()
        .filter_map(|event| match event {
            TimelineEventDto::Comment { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(comments, vec!["First!".to_string()]);
}
