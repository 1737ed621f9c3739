use serde::Deserialize;
use validator::Validate;

use super::organisation::validate_locale;
use super::{empty_string_as_none, trimmed, validate_uuid};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "Name is required."))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Enter a valid email address."), length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters."))]
    pub password: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_locale"))]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 72))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub invitation_id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 64, message = "Name is required."))]
    pub name: String,
    #[validate(length(min = 8, max = 72, message = "Password must be 8 to 72 characters."))]
    pub password: String,
}
