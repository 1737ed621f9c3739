use sea_orm::{ColumnTrait, EntityTrait, Iterable, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use entity::sea_orm_active_enums::DayOfWeek;
use entity::{organisation, user, work_hours, work_time_slot};

use crate::caching::{OrganisationCacheKey, UserCacheKey};
use crate::context::AppContext;
use crate::data::CacheSlot;
use crate::error::{Error, Result};
use crate::schemas::organisation::format_time_of_day;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotDto {
    pub id: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHoursDto {
    pub day_of_week: DayOfWeek,
    pub time_slots: Vec<TimeSlotDto>,
}

/// One entry per weekday, Sunday first. Days without a row come back closed.
pub async fn get_business_hours(ctx: &AppContext, session: &Session) -> Result<Vec<WorkHoursDto>> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::BusinessHours, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let days = work_hours::Entity::find()
                .filter(work_hours::Column::OrganisationId.eq(&session.organisation_id))
                .all(&ctx.db)
                .await?;
            let slots = if days.is_empty() {
                Vec::new()
            } else {
                work_time_slot::Entity::find()
                    .filter(work_time_slot::Column::WorkHoursId.is_in(days.iter().map(|d| d.id.clone())))
                    .order_by_asc(work_time_slot::Column::Start)
                    .all(&ctx.db)
                    .await?
            };

            Ok(DayOfWeek::iter()
                .map(|day| {
                    let ids: Vec<&str> = days
                        .iter()
                        .filter(|d| d.day_of_week == day)
                        .map(|d| d.id.as_str())
                        .collect();
                    WorkHoursDto {
                        day_of_week: day,
                        time_slots: slots
                            .iter()
                            .filter(|s| ids.contains(&s.work_hours_id.as_str()))
                            .map(|s| TimeSlotDto {
                                id: s.id.clone(),
                                start: format_time_of_day(s.start),
                                end: format_time_of_day(s.end),
                            })
                            .collect(),
                    }
                })
                .collect())
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationDetailsDto {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
}

pub async fn get_organisation_details(ctx: &AppContext, session: &Session) -> Result<OrganisationDetailsDto> {
    let slot = CacheSlot::organisation(session, OrganisationCacheKey::OrganisationDetails, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let org = organisation::Entity::find_by_id(session.organisation_id.clone())
                .one(&ctx.db)
                .await?
                .ok_or(Error::NotFound("Organisation"))?;
            Ok(OrganisationDetailsDto {
                name: org.name,
                address: org.address,
                phone: org.phone,
                email: org.email,
                website: org.website,
            })
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingOrganisationDto {
    pub name: String,
    pub completed_onboarding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingUserDto {
    pub name: String,
    pub email: Option<String>,
    pub image: Option<String>,
    pub completed_onboarding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingDataDto {
    pub organisation: OnboardingOrganisationDto,
    pub user: OnboardingUserDto,
}

pub async fn get_onboarding_data(ctx: &AppContext, session: &Session) -> Result<OnboardingDataDto> {
    let slot = CacheSlot::user(session, UserCacheKey::OnboardingData, &[])?;
    ctx.cache
        .cached(&slot.key_parts, &slot.tags, move || async move {
            let me = user::Entity::find_by_id(session.user_id.clone())
                .one(&ctx.db)
                .await?
                .ok_or(Error::NotFound("User"))?;
            let org = organisation::Entity::find_by_id(session.organisation_id.clone())
                .one(&ctx.db)
                .await?
                .ok_or(Error::NotFound("Organisation"))?;
            Ok(OnboardingDataDto {
                organisation: OnboardingOrganisationDto {
                    name: org.name,
                    completed_onboarding: org.completed_onboarding,
                },
                user: OnboardingUserDto {
                    name: me.name,
                    email: Some(me.email),
                    image: me.image,
                    completed_onboarding: me.completed_onboarding,
                },
            })
        })
        .await
}
