use serde::Deserialize;
use validator::Validate;

use super::{trimmed, validate_uuid};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PinnedOrder {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
    #[validate(range(min = 0))]
    pub order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPinnedInput {
    #[validate(nested)]
    pub pinned: Vec<PinnedOrder>,
}
