use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use validator::Validate;

use entity::sea_orm_active_enums::ContactRecord;
use entity::{contact, contact_page_visit};

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::data::contacts::display_name;
use crate::data::{read_uncommitted, CacheSlot};
use crate::error::Result;
use crate::schemas::data::DateRangeInput;
use crate::session::Session;
use crate::util::start_of_day;

const MOST_VISITED_LIMIT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitedContactDto {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub record: ContactRecord,
    pub page_visits: i64,
}

/// The organisation's six most visited contacts between the start of `from`'s day and
/// the end of `to`'s day.
pub async fn get_most_visited_contacts(
    ctx: &AppContext,
    session: &Session,
    input: DateRangeInput,
) -> Result<Vec<VisitedContactDto>> {
    input.validate()?;
    let from = start_of_day(input.from);
    let to = start_of_day(input.to) + 86_399;
    let (from_key, to_key) = (from.to_string(), to.to_string());

    let slot = CacheSlot::organisation(
        session,
        OrganisationCacheKey::ContactPageVisits,
        &[&from_key, &to_key],
    )?
    .also_organisation(session, OrganisationCacheKey::ContactPageVisits, &[])?
    .also_organisation(session, OrganisationCacheKey::Contacts, &[])?;

    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let txn = read_uncommitted(ctx).await?;
            let contacts = contact::Entity::find()
                .filter(contact::Column::OrganisationId.eq(&session.organisation_id))
                .all(&txn)
                .await?;
            let counts: HashMap<String, i64> = if contacts.is_empty() {
                HashMap::new()
            } else {
                contact_page_visit::Entity::find()
                    .select_only()
                    .column(contact_page_visit::Column::ContactId)
                    .column_as(Expr::col(contact_page_visit::Column::Id).count(), "visits")
                    .filter(contact_page_visit::Column::ContactId.is_in(contacts.iter().map(|c| c.id.clone())))
                    .filter(contact_page_visit::Column::Timestamp.gte(from))
                    .filter(contact_page_visit::Column::Timestamp.lte(to))
                    .group_by(contact_page_visit::Column::ContactId)
                    .into_tuple::<(String, i32)>()
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|(id, visits)| (id, i64::from(visits)))
                    .collect()
            };
            txn.commit().await?;

            let mut visited: Vec<VisitedContactDto> = contacts
                .into_iter()
                .map(|c| VisitedContactDto {
                    page_visits: counts.get(&c.id).copied().unwrap_or(0),
                    name: display_name(&c),
                    id: c.id,
                    image: c.image,
                    record: c.record,
                })
                .collect();
            visited.sort_by(|a, b| {
                b.page_visits
                    .cmp(&a.page_visits)
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.id.cmp(&b.id))
            });
            visited.truncate(MOST_VISITED_LIMIT);
            Ok(visited)
        })
        .await
}
