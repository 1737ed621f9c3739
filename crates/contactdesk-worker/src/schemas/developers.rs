use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{empty_string_as_none, trimmed, validate_uuid};

/// Events a webhook can subscribe to. Stored as a JSON array on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookTrigger {
    ContactCreated,
    ContactUpdated,
    ContactDeleted,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 70, message = "Description is required."))]
    pub description: String,
    /// Unix seconds; truncated to the start of that day.
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub never_expires: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(url(message = "Enter a valid URL."), length(max = 2000))]
    pub url: String,
    #[serde(default)]
    pub triggers: Vec<WebhookTrigger>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 1024))]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(url(message = "Enter a valid URL."), length(max = 2000))]
    pub url: String,
    #[serde(default)]
    pub triggers: Vec<WebhookTrigger>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 1024))]
    pub secret: Option<String>,
}
