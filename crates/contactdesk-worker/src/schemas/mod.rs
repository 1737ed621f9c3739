//! Validated action inputs.

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationError};

use crate::util::is_uuid_like;

pub mod auth;
pub mod contacts;
pub mod data;
pub mod developers;
pub mod members;
pub mod organisation;
pub mod pinned;

pub const SALUTATIONS: &[&str] = &["Mr", "Mrs", "Miss", "Ms", "Dr", "Prof", "Master"];

/// Deserializes trimmed strings, treating blanks the same as a missing field.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

pub fn validate_uuid(value: &str) -> Result<(), ValidationError> {
    if is_uuid_like(value) {
        Ok(())
    } else {
        Err(ValidationError::new("uuid").with_message("Id is invalid.".into()))
    }
}

pub fn validate_uuid_list(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().all(|v| is_uuid_like(v)) {
        Ok(())
    } else {
        Err(ValidationError::new("uuid").with_message("One or more ids are invalid.".into()))
    }
}

pub fn validate_salutation(value: &str) -> Result<(), ValidationError> {
    if SALUTATIONS.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new("salutation")
            .with_message("Salutation must be one of the predefined options.".into()))
    }
}

/// `{ id }` payloads shared by delete, revoke, and archive actions.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub id: String,
}

impl IdInput {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "validate_uuid"))]
    pub contact_id: String,
}

impl ContactIdInput {
    pub fn new(contact_id: impl Into<String>) -> Self {
        Self {
            contact_id: contact_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        value: Option<String>,
    }

    #[test]
    fn blank_strings_become_none() {
        let p: Probe = serde_json::from_str(r#"{"value":"   "}"#).unwrap();
        assert_eq!(p.value, None);
        let p: Probe = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(p.value, None);
        let p: Probe = serde_json::from_str(r#"{"value":" x "}"#).unwrap();
        assert_eq!(p.value.as_deref(), Some("x"));
    }

    #[test]
    fn id_input_requires_uuid() {
        assert!(IdInput::new("nope").validate().is_err());
        assert!(IdInput::new("0b8e2f0e-43c3-4b8b-a3e6-3f1c5d1b9a01")
            .validate()
            .is_ok());
    }
}
