mod common;

use pretty_assertions::assert_eq;
use sea_orm::ConnectionTrait;

use contactdesk_worker::data::contacts::get_contact_media;
use contactdesk_worker::media::{list_contact_media, upload_contact_media, MediaUpload};
use contactdesk_worker::schemas::ContactIdInput;
use contactdesk_worker::Error;

use common::{add_person, setup, sign_up};

fn pdf(name: &str, body: &[u8]) -> MediaUpload {
    MediaUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: body.to_vec(),
    }
}

#[tokio::test]
async fn uploads_are_stored_and_listed() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;

    assert!(list_contact_media(&app.ctx, &admin, &contact).await.unwrap().is_empty());

    let first = upload_contact_media(&app.ctx, &admin, &contact, pdf("quote.pdf", b"first"))
        .await
        .unwrap();
    assert_eq!(first.file_size, 5);
    assert_eq!(first.file_type, "application/pdf");
    assert!(first.file_url.starts_with("/uploads/") && first.file_url.ends_with(".pdf"));
    let key = first.file_url.trim_start_matches("/uploads/");
    assert_eq!(app.media.get(key), Some(b"first".to_vec()));

    let second = upload_contact_media(&app.ctx, &admin, &contact, pdf("contract.pdf", b"second"))
        .await
        .unwrap();

    let listed = get_contact_media(&app.ctx, &admin, ContactIdInput::new(&contact)).await.unwrap();
    assert_eq!(listed.len(), 2);
    let mut ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![first.id.as_str(), second.id.as_str()];
    expected.sort();
    assert_eq!(ids, expected);
    assert_eq!(app.media.len(), 2);
}

#[tokio::test]
async fn disallowed_types_never_reach_storage() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;

    let upload = MediaUpload {
        file_name: "page.html".to_string(),
        content_type: "text/html".to_string(),
        bytes: b"<html></html>".to_vec(),
    };
    let err = upload_contact_media(&app.ctx, &admin, &contact, upload).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(app.media.is_empty());
}

#[tokio::test]
async fn media_of_foreign_contacts_is_out_of_reach() {
    let app = setup().await;
    let ada = sign_up(&app, "Ada", "ada@example.com").await;
    let bob = sign_up(&app, "Bob", "bob@example.com").await;
    let contact = add_person(&app, &ada, "Grace", "Hopper").await;

    let err = upload_contact_media(&app.ctx, &bob, &contact, pdf("quote.pdf", b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound("Contact")));
    let err = list_contact_media(&app.ctx, &bob, &contact).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("Contact")));

    let err = list_contact_media(&app.ctx, &ada, "not-a-uuid").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(app.media.is_empty());
}

#[tokio::test]
async fn failed_metadata_writes_leave_no_stored_object() {
    let app = setup().await;
    let admin = sign_up(&app, "Ada", "ada@example.com").await;
    let contact = add_person(&app, &admin, "Grace", "Hopper").await;
    app.ctx
        .db
        .execute_unprepared("DROP TABLE contact_media")
        .await
        .unwrap();

    let err = upload_contact_media(&app.ctx, &admin, &contact, pdf("quote.pdf", b"orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Database(_)));
    assert!(app.media.is_empty());
}
