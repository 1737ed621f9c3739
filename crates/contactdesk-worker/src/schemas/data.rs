//! Query parameters of the paged and ranged reads.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::empty_string_as_none;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordsFilter {
    #[default]
    All,
    People,
    Companies,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContactSortBy {
    #[default]
    Name,
    Email,
    Phone,
    Stage,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

fn default_page_size() -> u64 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetContactsInput {
    #[serde(default)]
    pub page_index: u64,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: u64,
    #[serde(default)]
    pub records: RecordsFilter,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 2000))]
    pub search_query: Option<String>,
    #[serde(default)]
    pub sort_by: ContactSortBy,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

impl Default for GetContactsInput {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: default_page_size(),
            records: RecordsFilter::default(),
            archived: false,
            tags: Vec::new(),
            search_query: None,
            sort_by: ContactSortBy::default(),
            sort_direction: SortDirection::default(),
        }
    }
}

impl GetContactsInput {
    /// Cache key extras for this query. Each part is labelled so blank values
    /// never shift positions.
    pub fn key_extras(&self) -> Vec<String> {
        let mut tags = self.tags.clone();
        tags.sort();
        vec![
            format!("page={}", self.page_index),
            format!("size={}", self.page_size),
            format!("records={:?}", self.records).to_lowercase(),
            format!("archived={}", self.archived),
            format!("tags={}", tags.join(",")),
            format!("q={}", self.search_query.as_deref().unwrap_or_default()),
            format!("sort={:?}", self.sort_by).to_lowercase(),
            format!("dir={:?}", self.sort_direction).to_lowercase(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_range"))]
pub struct DateRangeInput {
    pub from: i64,
    pub to: i64,
}

fn validate_range(input: &DateRangeInput) -> Result<(), validator::ValidationError> {
    if input.from <= input.to {
        Ok(())
    } else {
        Err(validator::ValidationError::new("range")
            .with_message("Start must not be after end.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_query() {
        let input: GetContactsInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.page_size, 50);
        assert_eq!(input.records, RecordsFilter::All);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn key_extras_ignore_tag_order() {
        let a = GetContactsInput {
            tags: vec!["b".into(), "a".into()],
            ..Default::default()
        };
        let b = GetContactsInput {
            tags: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(a.key_extras(), b.key_extras());
    }
}
