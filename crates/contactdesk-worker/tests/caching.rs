mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use contactdesk_worker::actions::contacts::{archive_contact, delete_contact, update_contact_stage};
use contactdesk_worker::caching::{create_organisation_key_parts, OrganisationCacheKey};
use contactdesk_worker::data::contacts::{get_contact, get_contacts};
use contactdesk_worker::schemas::data::GetContactsInput;
use contactdesk_worker::schemas::IdInput;

use common::{add_person, input, setup, sign_up};

fn contacts_list_key(organisation_id: &str) -> Vec<String> {
    let extras = GetContactsInput::default().key_extras();
    let extras: Vec<&str> = extras.iter().map(String::as_str).collect();
    create_organisation_key_parts(OrganisationCacheKey::Contacts, organisation_id, &extras).unwrap()
}

fn contact_key(organisation_id: &str, contact_id: &str) -> Vec<String> {
    create_organisation_key_parts(OrganisationCacheKey::Contact, organisation_id, &[contact_id]).unwrap()
}

#[tokio::test]
async fn reads_are_served_from_cache_until_revalidated() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    add_person(&app, &admin, "Grace", "Hopper").await;

    let first = get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    assert_eq!(first.total_count, 1);
    assert!(app.ctx.cache.is_cached(&contacts_list_key(&admin.organisation_id)));

    // add_contact revalidates the list, so the second read sees the new row.
    add_person(&app, &admin, "Alan", "Turing").await;
    assert!(!app.ctx.cache.is_cached(&contacts_list_key(&admin.organisation_id)));
    let second = get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    assert_eq!(second.total_count, 2);
}

#[tokio::test]
async fn archive_revalidates_list_and_contact() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let id = add_person(&app, &admin, "Grace", "Hopper").await;

    get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    get_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap();
    assert!(app.ctx.cache.is_cached(&contact_key(&admin.organisation_id, &id)));

    archive_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap();

    assert!(!app.ctx.cache.is_cached(&contacts_list_key(&admin.organisation_id)));
    assert!(!app.ctx.cache.is_cached(&contact_key(&admin.organisation_id, &id)));
    assert!(get_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap().archived);
}

#[tokio::test]
async fn delete_revalidates_list_and_contact() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let id = add_person(&app, &admin, "Grace", "Hopper").await;

    get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    get_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap();

    delete_contact(&app.ctx, &admin, IdInput::new(&id)).await.unwrap();

    assert!(!app.ctx.cache.is_cached(&contacts_list_key(&admin.organisation_id)));
    assert!(!app.ctx.cache.is_cached(&contact_key(&admin.organisation_id, &id)));
    let page = get_contacts(&app.ctx, &admin, GetContactsInput::default()).await.unwrap();
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn other_organisations_keep_their_entries() {
    let app = setup().await;
    let ada = sign_up(&app, "Ada", "ada@example.com").await;
    let bob = sign_up(&app, "Bob", "bob@example.com").await;
    let id = add_person(&app, &ada, "Grace", "Hopper").await;
    add_person(&app, &bob, "Linus", "Torvalds").await;

    get_contacts(&app.ctx, &bob, GetContactsInput::default()).await.unwrap();
    update_contact_stage(&app.ctx, &ada, input(json!({ "id": id, "stage": "WON" })))
        .await
        .unwrap();

    assert!(app.ctx.cache.is_cached(&contacts_list_key(&bob.organisation_id)));
}
