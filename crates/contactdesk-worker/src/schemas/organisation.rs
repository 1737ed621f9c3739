use serde::Deserialize;
use validator::{Validate, ValidationError};

use entity::sea_orm_active_enums::{DayOfWeek, FeedbackCategory};

use super::{empty_string_as_none, trimmed};

const SECONDS_PER_DAY: i32 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganisationDetailsInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Name is required."))]
    pub name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 16))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email(message = "Enter a valid email address."), length(max = 255))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(url(message = "Enter a valid URL."), length(max = 2000))]
    pub website: Option<String>,
}

/// Parse `HH:MM` into seconds since midnight. `24:00` is accepted as end of day.
pub fn parse_time_of_day(value: &str) -> Option<i32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    (0..=SECONDS_PER_DAY).contains(&seconds).then_some(seconds)
}

pub fn format_time_of_day(seconds: i32) -> String {
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

fn validate_time_slot(slot: &TimeSlotInput) -> Result<(), ValidationError> {
    match (parse_time_of_day(&slot.start), parse_time_of_day(&slot.end)) {
        (Some(start), Some(end)) if start < end => Ok(()),
        (Some(_), Some(_)) => Err(ValidationError::new("time_slot")
            .with_message("End time must be after start time.".into())),
        _ => Err(ValidationError::new("time_slot")
            .with_message("Times must use the HH:MM format.".into())),
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_slot"))]
pub struct TimeSlotInput {
    pub start: String,
    pub end: String,
}

impl TimeSlotInput {
    /// Start and end in seconds since midnight; `None` when not validated first.
    pub fn seconds(&self) -> Option<(i32, i32)> {
        Some((parse_time_of_day(&self.start)?, parse_time_of_day(&self.end)?))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkHoursInput {
    pub day_of_week: DayOfWeek,
    #[serde(default)]
    #[validate(nested)]
    pub time_slots: Vec<TimeSlotInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusinessHoursInput {
    #[validate(nested)]
    pub business_hours: Vec<WorkHoursInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrganisationOnboardingInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Organisation name is required."))]
    pub organisation_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOnboardingInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Organisation name is required."))]
    pub organisation_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "Name is required."))]
    pub name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 16))]
    pub phone: Option<String>,
    /// Already-uploaded profile image URL.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub image: Option<String>,
}

pub fn validate_locale(value: &str) -> Result<(), ValidationError> {
    let mut parts = value.split('-');
    let language_ok = parts
        .next()
        .is_some_and(|l| (2..=3).contains(&l.len()) && l.chars().all(|c| c.is_ascii_lowercase()));
    let region_ok = parts.all(|p| {
        (2..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if language_ok && region_ok {
        Ok(())
    } else {
        Err(ValidationError::new("locale").with_message("Unsupported locale.".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_locale"))]
    pub locale: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendFeedbackInput {
    pub category: FeedbackCategory,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 4000, message = "Message is required."))]
    pub message: String,
}
