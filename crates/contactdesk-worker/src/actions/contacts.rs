//! Contact mutations and their timeline capture.

use std::collections::BTreeSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde_json::{json, Map, Value};
use tracing::info;
use validator::Validate;

use entity::sea_orm_active_enums::{ActionType, ContactRecord, ContactStage};
use entity::{
    contact, contact_comment, contact_note, contact_page_visit, contact_tag, contact_tag_link,
    contact_task,
};

use crate::actions::pinned::update_pinned_order;
use crate::actions::{capture_activity, find_contact};
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::contacts::{
    check_record_names, AddContactCommentInput, AddContactInput, AddContactNoteInput,
    AddContactTaskInput, ArchiveAction, ArchiveContactsInput, DeleteContactsInput,
    UpdateContactCommentInput, UpdateContactNoteInput, UpdateContactPropertiesInput,
    UpdateContactStageInput, UpdateContactTagsInput, UpdateContactTaskInput,
};
use crate::schemas::{ContactIdInput, IdInput};
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

// Bookkeeping columns that never show up in activity metadata.
const UNTRACKED_FIELDS: &[&str] = &["id", "organisation_id", "created_at", "updated_at"];

fn tracked_fields(model: &contact::Model) -> Result<Map<String, Value>> {
    let Value::Object(mut fields) = serde_json::to_value(model)? else {
        return Ok(Map::new());
    };
    fields.retain(|k, _| !UNTRACKED_FIELDS.contains(&k.as_str()));
    Ok(fields)
}

/// Fields of `after` that differ from `before`, as `{ field: new value }`.
pub(crate) fn changed_fields(before: &contact::Model, after: &contact::Model) -> Result<Value> {
    let before = tracked_fields(before)?;
    let after = tracked_fields(after)?;
    let changed: Map<String, Value> = after
        .into_iter()
        .filter(|(k, v)| before.get(k) != Some(v))
        .collect();
    Ok(Value::Object(changed))
}

async fn find_or_create_tag<C: ConnectionTrait>(conn: &C, text: &str) -> Result<contact_tag::Model> {
    if let Some(tag) = contact_tag::Entity::find()
        .filter(contact_tag::Column::Text.eq(text))
        .one(conn)
        .await?
    {
        return Ok(tag);
    }
    let tag = contact_tag::ActiveModel {
        id: Set(uuid_v4()?),
        text: Set(text.to_string()),
    }
    .insert(conn)
    .await?;
    Ok(tag)
}

/// Link `texts` to the contact, creating tags that do not exist yet.
pub(crate) async fn connect_tags<C: ConnectionTrait>(conn: &C, contact_id: &str, texts: &[String]) -> Result<()> {
    let wanted: BTreeSet<&str> = texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    for text in wanted {
        let tag = find_or_create_tag(conn, text).await?;
        let linked = contact_tag_link::Entity::find_by_id((contact_id.to_string(), tag.id.clone()))
            .one(conn)
            .await?
            .is_some();
        if !linked {
            contact_tag_link::Entity::insert(contact_tag_link::ActiveModel {
                contact_id: Set(contact_id.to_string()),
                tag_id: Set(tag.id),
            })
            .exec_without_returning(conn)
            .await?;
        }
    }
    Ok(())
}

/// Tags currently linked to a contact, sorted by text.
pub(crate) async fn tags_of<C: ConnectionTrait>(conn: &C, contact_id: &str) -> Result<Vec<contact_tag::Model>> {
    let tag_ids: Vec<String> = contact_tag_link::Entity::find()
        .filter(contact_tag_link::Column::ContactId.eq(contact_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| l.tag_id)
        .collect();
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut tags = contact_tag::Entity::find()
        .filter(contact_tag::Column::Id.is_in(tag_ids))
        .all(conn)
        .await?;
    tags.sort_by(|a, b| a.text.cmp(&b.text));
    Ok(tags)
}

/// Insert a contact plus its tag links and CREATE activity on `conn`.
pub(crate) async fn create_contact_and_capture<C: ConnectionTrait>(
    conn: &C,
    session: &Session,
    input: AddContactInput,
) -> Result<contact::Model> {
    let record = input.record.unwrap_or(ContactRecord::Person);
    check_record_names(
        record,
        input.first_name.as_deref(),
        input.last_name.as_deref(),
        input.company_name.as_deref(),
    )?;

    let now = now_ts();
    let contact = contact::ActiveModel {
        id: Set(uuid_v4()?),
        organisation_id: Set(session.organisation_id.clone()),
        record: Set(record),
        image: Set(None),
        salutation: Set(input.salutation),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        company_name: Set(input.company_name),
        email: Set(input.email),
        phone1: Set(input.phone1),
        phone2: Set(input.phone2),
        address: Set(input.address),
        company_registration_number: Set(input.company_registration_number),
        stage: Set(input.stage.unwrap_or(ContactStage::Lead)),
        archived: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    connect_tags(conn, &contact.id, &input.tags).await?;

    let mut metadata = tracked_fields(&contact)?;
    if !input.tags.is_empty() {
        metadata.insert("tags".to_string(), json!(input.tags));
    }
    capture_activity(
        conn,
        &contact.id,
        ActionType::Create,
        &session.user_id,
        Value::Object(metadata),
    )
    .await?;

    Ok(contact)
}

async fn update_contact_and_capture<C: ConnectionTrait>(
    conn: &C,
    session: &Session,
    before: &contact::Model,
    after: contact::ActiveModel,
) -> Result<contact::Model> {
    let updated = after.update(conn).await?;
    let changes = changed_fields(before, &updated)?;
    capture_activity(conn, &updated.id, ActionType::Update, &session.user_id, changes).await?;
    Ok(updated)
}

fn revalidate_contact(ctx: &AppContext, session: &Session, contact_id: &str) -> Result<()> {
    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::Contact, &[contact_id])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTimelineEvents, &[contact_id])?;
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    Ok(())
}

pub async fn add_contact(ctx: &AppContext, session: &Session, input: AddContactInput) -> Result<String> {
    input.validate()?;
    let has_tags = !input.tags.is_empty();

    let txn = ctx.db.begin().await?;
    let contact = create_contact_and_capture(&txn, session, input).await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::LeadGenerationData, &[])?;
    if has_tags {
        ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTags, &[])?;
    }
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;

    info!(contact_id = %contact.id, organisation_id = %session.organisation_id, "contact created");
    Ok(contact.id)
}

pub async fn update_contact_properties(
    ctx: &AppContext,
    session: &Session,
    input: UpdateContactPropertiesInput,
) -> Result<()> {
    input.validate()?;
    check_record_names(
        input.record,
        input.first_name.as_deref(),
        input.last_name.as_deref(),
        input.company_name.as_deref(),
    )?;

    let txn = ctx.db.begin().await?;
    let before = find_contact(&txn, &session.organisation_id, &input.id).await?;
    let mut active = before.clone().into_active_model();
    active.record = Set(input.record);
    active.salutation = Set(input.salutation);
    active.first_name = Set(input.first_name);
    active.last_name = Set(input.last_name);
    active.company_name = Set(input.company_name);
    active.email = Set(input.email);
    active.phone1 = Set(input.phone1);
    active.phone2 = Set(input.phone2);
    active.address = Set(input.address);
    active.company_registration_number = Set(input.company_registration_number);
    active.updated_at = Set(now_ts());
    update_contact_and_capture(&txn, session, &before, active).await?;
    txn.commit().await?;

    revalidate_contact(ctx, session, &input.id)
}

pub async fn update_contact_stage(
    ctx: &AppContext,
    session: &Session,
    input: UpdateContactStageInput,
) -> Result<()> {
    input.validate()?;

    let txn = ctx.db.begin().await?;
    let before = find_contact(&txn, &session.organisation_id, &input.id).await?;
    if before.stage == input.stage {
        return Ok(());
    }
    let mut active = before.clone().into_active_model();
    active.stage = Set(input.stage);
    active.updated_at = Set(now_ts());
    update_contact_and_capture(&txn, session, &before, active).await?;
    txn.commit().await?;

    revalidate_contact(ctx, session, &input.id)?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::LeadGenerationData, &[])?;
    Ok(())
}

/// Replace the contact's tags: connect-or-create the given texts, unlink the rest.
pub async fn update_contact_tags(
    ctx: &AppContext,
    session: &Session,
    input: UpdateContactTagsInput,
) -> Result<()> {
    input.validate()?;
    let wanted: BTreeSet<String> = input.tags.iter().map(|t| t.text.clone()).collect();

    let txn = ctx.db.begin().await?;
    let contact = find_contact(&txn, &session.organisation_id, &input.id).await?;
    let current = tags_of(&txn, &contact.id).await?;
    let current_texts: BTreeSet<String> = current.iter().map(|t| t.text.clone()).collect();
    if current_texts == wanted {
        return Ok(());
    }

    let stale: Vec<String> = current
        .into_iter()
        .filter(|t| !wanted.contains(&t.text))
        .map(|t| t.id)
        .collect();
    if !stale.is_empty() {
        contact_tag_link::Entity::delete_many()
            .filter(contact_tag_link::Column::ContactId.eq(&contact.id))
            .filter(contact_tag_link::Column::TagId.is_in(stale))
            .exec(&txn)
            .await?;
    }
    let wanted: Vec<String> = wanted.into_iter().collect();
    connect_tags(&txn, &contact.id, &wanted).await?;

    let mut active = contact.clone().into_active_model();
    active.updated_at = Set(now_ts());
    active.update(&txn).await?;
    capture_activity(
        &txn,
        &contact.id,
        ActionType::Update,
        &session.user_id,
        json!({ "tags": wanted }),
    )
    .await?;
    txn.commit().await?;

    revalidate_contact(ctx, session, &input.id)?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTags, &[])?;
    Ok(())
}

pub async fn archive_contact(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    archive_contacts(
        ctx,
        session,
        ArchiveContactsInput {
            ids: vec![input.id],
            action: ArchiveAction::Archive,
        },
    )
    .await
}

/// Archive or unarchive several contacts. Fails as a whole if any id is foreign.
pub async fn archive_contacts(
    ctx: &AppContext,
    session: &Session,
    input: ArchiveContactsInput,
) -> Result<()> {
    input.validate()?;
    let ids: BTreeSet<String> = input.ids.iter().cloned().collect();
    if ids.is_empty() {
        return Ok(());
    }

    let txn = ctx.db.begin().await?;
    let found = contact::Entity::find()
        .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
        .filter(contact::Column::Id.is_in(ids.iter().cloned()))
        .all(&txn)
        .await?;
    if found.len() != ids.len() {
        return Err(Error::NotFound("One or more contacts"));
    }

    let archived = input.action == ArchiveAction::Archive;
    let now = now_ts();
    for before in found.into_iter().filter(|c| c.archived != archived) {
        let mut active = before.clone().into_active_model();
        active.archived = Set(archived);
        active.updated_at = Set(now);
        update_contact_and_capture(&txn, session, &before, active).await?;
    }
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    for id in &ids {
        ctx.revalidate_organisation(session, OrganisationCacheKey::Contact, &[id])?;
        ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTimelineEvents, &[id])?;
    }
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;
    Ok(())
}

pub async fn delete_contact(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.id).await?;
    delete_contacts(ctx, session, DeleteContactsInput { ids: vec![input.id] }).await
}

/// Delete the organisation's contacts among `ids`; foreign ids are ignored.
pub async fn delete_contacts(ctx: &AppContext, session: &Session, input: DeleteContactsInput) -> Result<()> {
    input.validate()?;
    if input.ids.is_empty() {
        return Ok(());
    }

    let txn = ctx.db.begin().await?;
    let result = contact::Entity::delete_many()
        .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
        .filter(contact::Column::Id.is_in(input.ids.iter().cloned()))
        .exec(&txn)
        .await?;
    // Cascaded pins of any user may leave gaps.
    update_pinned_order(&txn, None).await?;
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::Contacts, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::LeadGenerationData, &[])?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactPageVisits, &[])?;
    for id in &input.ids {
        ctx.revalidate_organisation(session, OrganisationCacheKey::Contact, &[id])?;
    }
    ctx.revalidate_user(session, UserCacheKey::Pinned, &[])?;

    info!(
        organisation_id = %session.organisation_id,
        deleted = result.rows_affected,
        "contacts deleted"
    );
    Ok(())
}

pub async fn add_contact_page_visit(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<()> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;

    contact_page_visit::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(input.contact_id),
        user_id: Set(Some(session.user_id.clone())),
        timestamp: Set(now_ts()),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactPageVisits, &[])
}

async fn find_task(ctx: &AppContext, session: &Session, id: &str) -> Result<contact_task::Model> {
    let task = contact_task::Entity::find_by_id(id.to_string())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Contact task"))?;
    find_contact(&ctx.db, &session.organisation_id, &task.contact_id)
        .await
        .map_err(|_| Error::NotFound("Contact task"))?;
    Ok(task)
}

pub async fn add_contact_task(ctx: &AppContext, session: &Session, input: AddContactTaskInput) -> Result<String> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;

    let now = now_ts();
    let task = contact_task::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(input.contact_id.clone()),
        title: Set(input.title),
        description: Set(input.description),
        status: Set(input.status),
        due_date: Set(input.due_date),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTasks, &[&input.contact_id])?;
    Ok(task.id)
}

pub async fn update_contact_task(ctx: &AppContext, session: &Session, input: UpdateContactTaskInput) -> Result<()> {
    input.validate()?;
    let task = find_task(ctx, session, &input.id).await?;
    let contact_id = task.contact_id.clone();

    let mut active = task.into_active_model();
    active.title = Set(input.title);
    active.description = Set(input.description);
    active.status = Set(input.status);
    active.due_date = Set(input.due_date);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTasks, &[&contact_id])
}

pub async fn delete_contact_task(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let task = find_task(ctx, session, &input.id).await?;
    contact_task::Entity::delete_by_id(task.id).exec(&ctx.db).await?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTasks, &[&task.contact_id])
}

async fn find_note(ctx: &AppContext, session: &Session, id: &str) -> Result<contact_note::Model> {
    let note = contact_note::Entity::find_by_id(id.to_string())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Contact note"))?;
    find_contact(&ctx.db, &session.organisation_id, &note.contact_id)
        .await
        .map_err(|_| Error::NotFound("Contact note"))?;
    Ok(note)
}

pub async fn add_contact_note(ctx: &AppContext, session: &Session, input: AddContactNoteInput) -> Result<String> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;

    let now = now_ts();
    let note = contact_note::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(input.contact_id.clone()),
        user_id: Set(Some(session.user_id.clone())),
        text: Set(input.text),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactNotes, &[&input.contact_id])?;
    Ok(note.id)
}

pub async fn update_contact_note(ctx: &AppContext, session: &Session, input: UpdateContactNoteInput) -> Result<()> {
    input.validate()?;
    let note = find_note(ctx, session, &input.id).await?;
    let contact_id = note.contact_id.clone();

    let mut active = note.into_active_model();
    active.text = Set(input.text);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactNotes, &[&contact_id])
}

pub async fn delete_contact_note(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let note = find_note(ctx, session, &input.id).await?;
    contact_note::Entity::delete_by_id(note.id).exec(&ctx.db).await?;
    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactNotes, &[&note.contact_id])
}

async fn find_comment(ctx: &AppContext, session: &Session, id: &str) -> Result<contact_comment::Model> {
    let comment = contact_comment::Entity::find_by_id(id.to_string())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Contact comment"))?;
    find_contact(&ctx.db, &session.organisation_id, &comment.contact_id)
        .await
        .map_err(|_| Error::NotFound("Contact comment"))?;
    Ok(comment)
}

pub async fn add_contact_comment(
    ctx: &AppContext,
    session: &Session,
    input: AddContactCommentInput,
) -> Result<String> {
    input.validate()?;
    find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;

    let now = now_ts();
    let comment = contact_comment::ActiveModel {
        id: Set(uuid_v4()?),
        contact_id: Set(input.contact_id.clone()),
        user_id: Set(session.user_id.clone()),
        text: Set(input.text),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&ctx.db)
    .await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTimelineEvents, &[&input.contact_id])?;
    Ok(comment.id)
}

/// Comments can only be edited by their author.
pub async fn update_contact_comment(
    ctx: &AppContext,
    session: &Session,
    input: UpdateContactCommentInput,
) -> Result<()> {
    input.validate()?;
    let comment = find_comment(ctx, session, &input.id).await?;
    if comment.user_id != session.user_id {
        return Err(Error::forbidden("Only the author can edit this comment"));
    }
    let contact_id = comment.contact_id.clone();

    let mut active = comment.into_active_model();
    active.text = Set(input.text);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::ContactTimelineEvents, &[&contact_id])
}

pub async fn delete_contact_comment(ctx: &AppContext, session: &Session, input: IdInput) -> Result<()> {
    input.validate()?;
    let comment = find_comment(ctx, session, &input.id).await?;
    if comment.user_id != session.user_id && !session.is_admin() {
        return Err(Error::forbidden("Only the author can delete this comment"));
    }
    contact_comment::Entity::delete_by_id(comment.id).exec(&ctx.db).await?;
    ctx.revalidate_organisation(
        session,
        OrganisationCacheKey::ContactTimelineEvents,
        &[&comment.contact_id],
    )
}

#[cfg(test)]
mod tests {
    use entity::sea_orm_active_enums::{ContactRecord, ContactStage};
    use pretty_assertions::assert_eq;

    use super::*;

    fn model() -> contact::Model {
        contact::Model {
            id: "c1".into(),
            organisation_id: "o1".into(),
            record: ContactRecord::Person,
            image: None,
            salutation: None,
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            company_name: None,
            email: None,
            phone1: None,
            phone2: None,
            address: None,
            company_registration_number: None,
            stage: ContactStage::Lead,
            archived: false,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn changed_fields_reports_only_differences() {
        let before = model();
        let mut after = model();
        after.stage = ContactStage::Won;
        after.email = Some("ada@example.com".into());
        after.updated_at = 99;

        let changes = changed_fields(&before, &after).unwrap();
        assert_eq!(
            changes,
            json!({ "email": "ada@example.com", "stage": "WON" })
        );
    }
}
