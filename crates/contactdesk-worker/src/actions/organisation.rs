use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, Iterable,
    QueryFilter, Set, TransactionTrait,
};
use tracing::info;
use validator::Validate;

use entity::sea_orm_active_enums::DayOfWeek;
use entity::{organisation, work_hours, work_time_slot};

use crate::caching::OrganisationCacheKey;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::schemas::organisation::{UpdateBusinessHoursInput, UpdateOrganisationDetailsInput};
use crate::session::Session;
use crate::util::{now_ts, uuid_v4};

const NINE_AM: i32 = 9 * 3600;
const FIVE_PM: i32 = 17 * 3600;

fn is_weekday(day: DayOfWeek) -> bool {
    !matches!(day, DayOfWeek::Saturday | DayOfWeek::Sunday)
}

/// One `work_hours` row per day; Monday to Friday get a 09:00-17:00 slot.
pub(crate) async fn create_default_business_hours<C: ConnectionTrait>(conn: &C, organisation_id: &str) -> Result<()> {
    for day in DayOfWeek::iter() {
        let hours = work_hours::ActiveModel {
            id: Set(uuid_v4()?),
            organisation_id: Set(organisation_id.to_string()),
            day_of_week: Set(day),
        }
        .insert(conn)
        .await?;
        if is_weekday(day) {
            work_time_slot::ActiveModel {
                id: Set(uuid_v4()?),
                work_hours_id: Set(hours.id),
                start: Set(NINE_AM),
                end: Set(FIVE_PM),
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

pub async fn update_organisation_details(
    ctx: &AppContext,
    session: &Session,
    input: UpdateOrganisationDetailsInput,
) -> Result<()> {
    input.validate()?;

    let org = organisation::Entity::find_by_id(session.organisation_id.clone())
        .one(&ctx.db)
        .await?
        .ok_or(Error::NotFound("Organisation"))?;
    let mut active = org.into_active_model();
    active.name = Set(input.name);
    active.address = Set(input.address);
    active.phone = Set(input.phone);
    active.email = Set(input.email);
    active.website = Set(input.website);
    active.updated_at = Set(now_ts());
    active.update(&ctx.db).await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::OrganisationDetails, &[])
}

/// Replace every time slot of the organisation with the submitted ones.
///
/// Days missing from the input end up closed.
pub async fn update_business_hours(
    ctx: &AppContext,
    session: &Session,
    input: UpdateBusinessHoursInput,
) -> Result<()> {
    input.validate()?;

    let txn = ctx.db.begin().await?;
    let mut days = work_hours::Entity::find()
        .filter(work_hours::Column::OrganisationId.eq(&session.organisation_id))
        .all(&txn)
        .await?;
    let day_ids: Vec<String> = days.iter().map(|d| d.id.clone()).collect();
    if !day_ids.is_empty() {
        work_time_slot::Entity::delete_many()
            .filter(work_time_slot::Column::WorkHoursId.is_in(day_ids))
            .exec(&txn)
            .await?;
    }

    for entry in &input.business_hours {
        let hours_id = match days.iter().find(|d| d.day_of_week == entry.day_of_week) {
            Some(existing) => existing.id.clone(),
            None => {
                let created = work_hours::ActiveModel {
                    id: Set(uuid_v4()?),
                    organisation_id: Set(session.organisation_id.clone()),
                    day_of_week: Set(entry.day_of_week),
                }
                .insert(&txn)
                .await?;
                let id = created.id.clone();
                days.push(created);
                id
            }
        };
        for slot in &entry.time_slots {
            let (start, end) = slot
                .seconds()
                .ok_or_else(|| Error::invalid("Times must use the HH:MM format."))?;
            work_time_slot::ActiveModel {
                id: Set(uuid_v4()?),
                work_hours_id: Set(hours_id.clone()),
                start: Set(start),
                end: Set(end),
            }
            .insert(&txn)
            .await?;
        }
    }
    txn.commit().await?;

    ctx.revalidate_organisation(session, OrganisationCacheKey::BusinessHours, &[])?;
    info!(organisation_id = %session.organisation_id, "business hours updated");
    Ok(())
}
