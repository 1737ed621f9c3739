use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use entity::sea_orm_active_enums::{ActionType, ContactRecord, ContactStage, ContactTaskStatus};
use entity::{
    contact, contact_activity, contact_comment, contact_note, contact_tag, contact_tag_link,
    contact_task, pinned, user,
};

use crate::actions::find_contact;
use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::data::{read_uncommitted, CacheSlot};
use crate::error::Result;
use crate::media::{list_contact_media, ContactMediaDto};
use crate::schemas::data::{ContactSortBy, GetContactsInput, RecordsFilter, SortDirection};
use crate::schemas::{ContactIdInput, IdInput};
use crate::session::Session;
use crate::util::ts_to_rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDto {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub id: String,
    pub organisation_id: String,
    pub record: ContactRecord,
    pub name: String,
    pub image: Option<String>,
    pub salutation: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub email: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub address: Option<String>,
    pub company_registration_number: Option<String>,
    pub stage: ContactStage,
    pub archived: bool,
    pub tags: Vec<TagDto>,
    pub created_at: String,
    pub updated_at: String,
}

/// Display name derived from the split name fields.
pub fn display_name(c: &contact::Model) -> String {
    let person = || {
        [c.first_name.as_deref(), c.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let company = || c.company_name.clone().unwrap_or_default();
    let name = match c.record {
        ContactRecord::Person => person(),
        ContactRecord::Company => company(),
    };
    if name.is_empty() {
        match c.record {
            ContactRecord::Person => company(),
            ContactRecord::Company => person(),
        }
    } else {
        name
    }
}

impl ContactDto {
    pub fn new(c: contact::Model, tags: Vec<TagDto>) -> Self {
        Self {
            name: display_name(&c),
            id: c.id,
            organisation_id: c.organisation_id,
            record: c.record,
            image: c.image,
            salutation: c.salutation,
            first_name: c.first_name,
            last_name: c.last_name,
            company_name: c.company_name,
            email: c.email,
            phone1: c.phone1,
            phone2: c.phone2,
            address: c.address,
            company_registration_number: c.company_registration_number,
            stage: c.stage,
            archived: c.archived,
            tags,
            created_at: ts_to_rfc3339(c.created_at),
            updated_at: ts_to_rfc3339(c.updated_at),
        }
    }
}

/// Tags for each of `contact_ids`, sorted by text.
pub(crate) async fn tags_by_contact<C: ConnectionTrait>(
    conn: &C,
    contact_ids: &[String],
) -> Result<HashMap<String, Vec<TagDto>>> {
    let mut out: HashMap<String, Vec<TagDto>> = HashMap::new();
    if contact_ids.is_empty() {
        return Ok(out);
    }
    let links = contact_tag_link::Entity::find()
        .filter(contact_tag_link::Column::ContactId.is_in(contact_ids.iter().cloned()))
        .all(conn)
        .await?;
    if links.is_empty() {
        return Ok(out);
    }
    let tags: HashMap<String, contact_tag::Model> = contact_tag::Entity::find()
        .filter(contact_tag::Column::Id.is_in(links.iter().map(|l| l.tag_id.clone())))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();
    for link in links {
        if let Some(tag) = tags.get(&link.tag_id) {
            out.entry(link.contact_id).or_default().push(TagDto {
                id: tag.id.clone(),
                text: tag.text.clone(),
            });
        }
    }
    for list in out.values_mut() {
        list.sort_by(|a, b| a.text.cmp(&b.text));
    }
    Ok(out)
}

pub(crate) async fn to_dtos<C: ConnectionTrait>(conn: &C, contacts: Vec<contact::Model>) -> Result<Vec<ContactDto>> {
    let ids: Vec<String> = contacts.iter().map(|c| c.id.clone()).collect();
    let mut tags = tags_by_contact(conn, &ids).await?;
    Ok(contacts
        .into_iter()
        .map(|c| {
            let t = tags.remove(&c.id).unwrap_or_default();
            ContactDto::new(c, t)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactsPage {
    pub contacts: Vec<ContactDto>,
    pub filtered_count: u64,
    pub total_count: u64,
}

fn records_filter(records: RecordsFilter) -> Option<ContactRecord> {
    match records {
        RecordsFilter::All => None,
        RecordsFilter::People => Some(ContactRecord::Person),
        RecordsFilter::Companies => Some(ContactRecord::Company),
    }
}

fn apply_sort(select: Select<contact::Entity>, sort_by: ContactSortBy, direction: SortDirection) -> Select<contact::Entity> {
    let order = match direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    let select = match sort_by {
        ContactSortBy::Name => select
            .order_by(
                Expr::cust("COALESCE(last_name, company_name, first_name, '')"),
                order.clone(),
            )
            .order_by(contact::Column::FirstName, order.clone()),
        ContactSortBy::Email => select.order_by(contact::Column::Email, order.clone()),
        ContactSortBy::Phone => select.order_by(contact::Column::Phone1, order.clone()),
        ContactSortBy::Stage => select.order_by(contact::Column::Stage, order.clone()),
        ContactSortBy::CreatedAt => select.order_by(contact::Column::CreatedAt, order.clone()),
    };
    select.order_by(contact::Column::Id, order)
}

pub async fn get_contacts(ctx: &AppContext, session: &Session, input: GetContactsInput) -> Result<ContactsPage> {
    input.validate()?;
    let extras = input.key_extras();
    let extras: Vec<&str> = extras.iter().map(String::as_str).collect();
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::Contacts, &extras)?;
    let tags = [
        CacheSlot::organisation(session, OrganisationCacheKey::Contacts, &[])?.tags,
        CacheSlot::organisation(session, OrganisationCacheKey::ContactTags, &[])?.tags,
    ]
    .concat();

    ctx.cache
        .cached(&slot.key_parts, &tags, move || async move {
            let txn = read_uncommitted(ctx).await?;

            let base = contact::Entity::find()
                .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
                .filter(contact::Column::Archived.eq(input.archived));
            let total_count = base.clone().count(&txn).await?;

            let mut filtered = base;
            if let Some(record) = records_filter(input.records) {
                filtered = filtered.filter(contact::Column::Record.eq(record));
            }
            if !input.tags.is_empty() {
                let tag_ids: Vec<String> = contact_tag::Entity::find()
                    .filter(contact_tag::Column::Text.is_in(input.tags.iter().cloned()))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();
                let tagged: Vec<String> = contact_tag_link::Entity::find()
                    .filter(contact_tag_link::Column::TagId.is_in(tag_ids))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|l| l.contact_id)
                    .collect();
                filtered = filtered.filter(contact::Column::Id.is_in(tagged));
            }
            if let Some(query) = input.search_query.as_deref() {
                filtered = filtered.filter(
                    Condition::any()
                        .add(contact::Column::FirstName.contains(query))
                        .add(contact::Column::LastName.contains(query))
                        .add(contact::Column::CompanyName.contains(query))
                        .add(contact::Column::Phone1.contains(query))
                        .add(contact::Column::Email.contains(query)),
                );
            }
            let filtered_count = filtered.clone().count(&txn).await?;

            let rows = apply_sort(filtered, input.sort_by, input.sort_direction)
                .offset(input.page_index * input.page_size)
                .limit(input.page_size)
                .all(&txn)
                .await?;
            let contacts = to_dtos(&txn, rows).await?;
            txn.commit().await?;

            Ok(ContactsPage {
                contacts,
                filtered_count,
                total_count,
            })
        })
        .await
}

pub async fn get_contact(ctx: &AppContext, session: &Session, input: IdInput) -> Result<ContactDto> {
    input.validate()?;
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::Contact, &[&input.id])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let found = find_contact(&ctx.db, &session.organisation_id, &input.id).await?;
            let mut dtos = to_dtos(&ctx.db, vec![found]).await?;
            dtos.pop().ok_or(crate::error::Error::NotFound("Contact"))
        })
        .await
}

/// Every tag used by at least one of the organisation's contacts.
pub async fn get_contact_tags(ctx: &AppContext, session: &Session) -> Result<Vec<TagDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::ContactTags, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let contact_ids: Vec<String> = contact::Entity::find()
                .select_only()
                .column(contact::Column::Id)
                .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
                .into_tuple()
                .all(&ctx.db)
                .await?;
            let mut tags: Vec<TagDto> = tags_by_contact(&ctx.db, &contact_ids)
                .await?
                .into_values()
                .flatten()
                .collect();
            tags.sort_by(|a, b| a.text.cmp(&b.text));
            tags.dedup_by(|a, b| a.id == b.id);
            Ok(tags)
        })
        .await
}

pub async fn get_contact_is_in_pinned(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<bool> {
    input.validate()?;
    let slot = CacheSlot::user(session, UserCacheKey::ContactIsInPinned, &[&input.contact_id])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let count = pinned::Entity::find()
                .filter(pinned::Column::UserId.eq(&session.user_id))
                .filter(pinned::Column::ContactId.eq(&input.contact_id))
                .count(&ctx.db)
                .await?;
            Ok(count > 0)
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactTaskDto {
    pub id: String,
    pub contact_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: ContactTaskStatus,
    pub due_date: Option<String>,
    pub created_at: String,
}

pub async fn get_contact_tasks(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<Vec<ContactTaskDto>> {
    input.validate()?;
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::ContactTasks, &[&input.contact_id])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;
            let tasks = contact_task::Entity::find()
                .filter(contact_task::Column::ContactId.eq(&input.contact_id))
                .order_by_asc(contact_task::Column::CreatedAt)
                .order_by_asc(contact_task::Column::Id)
                .all(&ctx.db)
                .await?;
            Ok(tasks
                .into_iter()
                .map(|t| ContactTaskDto {
                    id: t.id,
                    contact_id: t.contact_id,
                    title: t.title,
                    description: t.description,
                    status: t.status,
                    due_date: t.due_date.map(ts_to_rfc3339),
                    created_at: ts_to_rfc3339(t.created_at),
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

async fn profiles<C: ConnectionTrait>(conn: &C, ids: Vec<String>) -> Result<HashMap<String, ProfileDto>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id.clone(),
                ProfileDto {
                    id: u.id,
                    name: u.name,
                    image: u.image,
                },
            )
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactNoteDto {
    pub id: String,
    pub contact_id: String,
    pub text: Option<String>,
    pub edited: bool,
    pub sender: Option<ProfileDto>,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn get_contact_notes(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<Vec<ContactNoteDto>> {
    input.validate()?;
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::ContactNotes, &[&input.contact_id])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;
            let notes = contact_note::Entity::find()
                .filter(contact_note::Column::ContactId.eq(&input.contact_id))
                .order_by_desc(contact_note::Column::CreatedAt)
                .order_by_desc(contact_note::Column::Id)
                .all(&ctx.db)
                .await?;
            let senders = profiles(&ctx.db, notes.iter().filter_map(|n| n.user_id.clone()).collect()).await?;
            Ok(notes
                .into_iter()
                .map(|n| ContactNoteDto {
                    sender: n.user_id.as_ref().and_then(|id| senders.get(id).cloned()),
                    edited: n.updated_at > n.created_at,
                    id: n.id,
                    contact_id: n.contact_id,
                    text: n.text,
                    created_at: ts_to_rfc3339(n.created_at),
                    updated_at: ts_to_rfc3339(n.updated_at),
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimelineEventDto {
    #[serde(rename_all = "camelCase")]
    Activity {
        id: String,
        contact_id: String,
        action_type: ActionType,
        actor: Option<ProfileDto>,
        metadata: Option<serde_json::Value>,
        occurred_at: String,
    },
    #[serde(rename_all = "camelCase")]
    Comment {
        id: String,
        contact_id: String,
        text: String,
        sender: Option<ProfileDto>,
        edited: bool,
        occurred_at: String,
    },
}

/// Activities and comments of one contact, newest first.
pub async fn get_contact_timeline(
    ctx: &AppContext,
    session: &Session,
    input: ContactIdInput,
) -> Result<Vec<TimelineEventDto>> {
    input.validate()?;
    let slot = CacheSlot::organisation(
        session,
        OrganisationCacheKey::ContactTimelineEvents,
        &[&input.contact_id],
    )?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            find_contact(&ctx.db, &session.organisation_id, &input.contact_id).await?;
            let activities = contact_activity::Entity::find()
                .filter(contact_activity::Column::ContactId.eq(&input.contact_id))
                .all(&ctx.db)
                .await?;
            let comments = contact_comment::Entity::find()
                .filter(contact_comment::Column::ContactId.eq(&input.contact_id))
                .all(&ctx.db)
                .await?;

            let people: Vec<String> = activities
                .iter()
                .map(|a| a.actor_id.clone())
                .chain(comments.iter().map(|c| c.user_id.clone()))
                .collect();
            let people = profiles(&ctx.db, people).await?;

            let mut events: Vec<(i64, String, TimelineEventDto)> = Vec::new();
            for a in activities {
                let metadata = a
                    .metadata
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok());
                events.push((
                    a.occurred_at,
                    a.id.clone(),
                    TimelineEventDto::Activity {
                        actor: people.get(&a.actor_id).cloned(),
                        id: a.id,
                        contact_id: a.contact_id,
                        action_type: a.action_type,
                        metadata,
                        occurred_at: ts_to_rfc3339(a.occurred_at),
                    },
                ));
            }
            for c in comments {
                events.push((
                    c.created_at,
                    c.id.clone(),
                    TimelineEventDto::Comment {
                        sender: people.get(&c.user_id).cloned(),
                        edited: c.updated_at > c.created_at,
                        id: c.id,
                        contact_id: c.contact_id,
                        text: c.text,
                        occurred_at: ts_to_rfc3339(c.created_at),
                    },
                ));
            }
            events.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
            Ok(events.into_iter().map(|(_, _, e)| e).collect())
        })
        .await
}

pub async fn get_contact_media(ctx: &AppContext, session: &Session, input: ContactIdInput) -> Result<Vec<ContactMediaDto>> {
    input.validate()?;
    list_contact_media(ctx, session, &input.contact_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(record: ContactRecord) -> contact::Model {
        contact::Model {
            id: "c1".into(),
            organisation_id: "o1".into(),
            record,
            image: None,
            salutation: None,
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            company_name: Some("Analytical Engines".into()),
            email: None,
            phone1: None,
            phone2: None,
            address: None,
            company_registration_number: None,
            stage: ContactStage::Lead,
            archived: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn display_name_follows_record_type() {
        assert_eq!(display_name(&model(ContactRecord::Person)), "Ada Lovelace");
        assert_eq!(display_name(&model(ContactRecord::Company)), "Analytical Engines");
    }

    #[test]
    fn display_name_falls_back_when_primary_is_blank() {
        let mut c = model(ContactRecord::Company);
        c.company_name = None;
        assert_eq!(display_name(&c), "Ada Lovelace");
    }
}
